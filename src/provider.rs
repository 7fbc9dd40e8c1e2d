//! Provider protocol client
//!
//! Issues the info, order, substitute and confirm requests and turns the
//! provider's performative-tagged replies into typed outcomes.

mod error;
mod http;
mod types;
mod wire;


pub use error::{TransportError, TransportErrorKind};
pub use http::HttpProviderClient;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// The provider protocol, one method per endpoint
///
/// Implementations own no session state; callers apply the results.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// `POST /info`; `None` only on the first call of a session
    async fn query_menu(&self, conversation_id: Option<&str>)
        -> Result<MenuListing, TransportError>;

    /// `POST /order`
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderOutcome, TransportError>;

    /// `POST /order/substitute`
    async fn choose_substitution(
        &self,
        conversation_id: &str,
        item: &str,
    ) -> Result<SubstitutionOutcome, TransportError>;

    /// `POST /order/confirm`
    async fn confirm_order(&self, conversation_id: &str) -> Result<FinalRecord, TransportError>;

    /// `GET /logs` or `GET /logs/{id}`; read-only, never drives session state
    async fn query_logs(&self, conversation_id: Option<&str>)
        -> Result<Vec<LogEntry>, TransportError>;
}

#[async_trait]
impl<T: ProviderClient + ?Sized> ProviderClient for Arc<T> {
    async fn query_menu(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<MenuListing, TransportError> {
        (**self).query_menu(conversation_id).await
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderOutcome, TransportError> {
        (**self).place_order(request).await
    }

    async fn choose_substitution(
        &self,
        conversation_id: &str,
        item: &str,
    ) -> Result<SubstitutionOutcome, TransportError> {
        (**self).choose_substitution(conversation_id, item).await
    }

    async fn confirm_order(&self, conversation_id: &str) -> Result<FinalRecord, TransportError> {
        (**self).confirm_order(conversation_id).await
    }

    async fn query_logs(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<LogEntry>, TransportError> {
        (**self).query_logs(conversation_id).await
    }
}

/// Logging wrapper for provider clients
pub struct LoggingClient<C> {
    inner: C,
}

impl<C: ProviderClient> LoggingClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    fn record<T>(
        operation: &'static str,
        conversation_id: Option<&str>,
        start: Instant,
        result: &Result<T, TransportError>,
        summarize: impl FnOnce(&T) -> String,
    ) {
        let duration = start.elapsed();
        let conversation_id = conversation_id.unwrap_or("-");
        match result {
            Ok(value) => {
                tracing::info!(
                    operation,
                    conversation_id,
                    duration_ms = %duration.as_millis(),
                    outcome = %summarize(value),
                    "Provider call completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    operation,
                    conversation_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.label(),
                    "Provider call failed"
                );
            }
        }
    }
}

#[async_trait]
impl<C: ProviderClient> ProviderClient for LoggingClient<C> {
    async fn query_menu(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<MenuListing, TransportError> {
        let start = Instant::now();
        let result = self.inner.query_menu(conversation_id).await;
        Self::record("query_menu", conversation_id, start, &result, |listing| {
            format!("{} options", listing.options.len())
        });
        result
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderOutcome, TransportError> {
        let start = Instant::now();
        let result = self.inner.place_order(request).await;
        Self::record(
            "place_order",
            Some(&request.conversation_id),
            start,
            &result,
            |outcome| match outcome {
                OrderOutcome::Accepted(_) => "accepted".to_string(),
                OrderOutcome::RejectedWithAlternatives { candidates, .. } => {
                    format!("rejected with {} alternatives", candidates.len())
                }
                OrderOutcome::RejectedFinal { .. } => "rejected".to_string(),
            },
        );
        result
    }

    async fn choose_substitution(
        &self,
        conversation_id: &str,
        item: &str,
    ) -> Result<SubstitutionOutcome, TransportError> {
        let start = Instant::now();
        let result = self.inner.choose_substitution(conversation_id, item).await;
        Self::record(
            "choose_substitution",
            Some(conversation_id),
            start,
            &result,
            |outcome| match outcome {
                SubstitutionOutcome::Accepted(_) => "accepted".to_string(),
                SubstitutionOutcome::RejectedFinal { .. } => "rejected".to_string(),
            },
        );
        result
    }

    async fn confirm_order(&self, conversation_id: &str) -> Result<FinalRecord, TransportError> {
        let start = Instant::now();
        let result = self.inner.confirm_order(conversation_id).await;
        Self::record(
            "confirm_order",
            Some(conversation_id),
            start,
            &result,
            |record| record.status.clone(),
        );
        result
    }

    async fn query_logs(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<LogEntry>, TransportError> {
        let start = Instant::now();
        let result = self.inner.query_logs(conversation_id).await;
        Self::record("query_logs", conversation_id, start, &result, |entries| {
            format!("{} entries", entries.len())
        });
        result
    }
}
