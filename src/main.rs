//! Order Chat - conversational ordering front end
//!
//! Drives a customer through menu, order, substitution and confirmation
//! against a restaurant provider speaking a performative-tagged HTTP protocol.

mod config;
mod console;
mod provider;
mod runtime;
mod state_machine;
mod transcript;

use config::AppConfig;
use provider::{HttpProviderClient, LoggingClient};
use state_machine::SessionContext;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the console transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;
    tracing::info!(
        provider_url = %config.provider_url,
        timeout_secs = config.request_timeout.as_secs(),
        reset_delay_ms = u64::try_from(config.reset_delay.as_millis()).unwrap_or(u64::MAX),
        "Configuration loaded"
    );

    let client = Arc::new(LoggingClient::new(HttpProviderClient::new(
        &config.provider_url,
        config.request_timeout,
    )?));

    let handle = runtime::spawn_session(
        client.clone(),
        SessionContext {
            reset_delay: config.reset_delay,
        },
    );

    console::run(handle, client).await?;
    tracing::info!("Console closed");

    Ok(())
}
