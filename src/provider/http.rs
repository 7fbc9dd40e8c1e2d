//! HTTP implementation of the provider protocol

use super::types::{
    FinalRecord, LogEntry, MenuListing, OrderOutcome, OrderRequest, SubstitutionOutcome,
};
use super::wire::{
    self, ConfirmRequestBody, ConfirmResponse, InfoRequestBody, InfoResponse, OrderRequestBody,
    OrderResponse, SubstituteRequestBody, SubstituteResponse,
};
use super::{ProviderClient, TransportError};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Provider client speaking JSON over HTTP
pub struct HttpProviderClient {
    client: Client,
    base_url: String,
}

impl HttpProviderClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, TransportError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    /// `/logs`, or `/logs/{id}` with the id escaped as a single path segment
    fn logs_url(&self, conversation_id: Option<&str>) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TransportError::protocol(format!("Invalid provider URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| TransportError::protocol("Provider URL cannot carry a path"))?
            .pop_if_empty()
            .push("logs")
            .extend(conversation_id);
        Ok(url)
    }

    async fn get<R: DeserializeOwned>(&self, url: Url) -> Result<R, TransportError> {
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, TransportError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %body, "Provider error response");
            return Err(TransportError::status(status.as_u16(), &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| TransportError::decode(format!("Malformed response body: {e}")))
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn query_menu(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<MenuListing, TransportError> {
        let body = InfoRequestBody {
            conversation_id,
            slot: None,
        };
        let resp: InfoResponse = self.post("/info", &body).await?;
        wire::normalize_menu(resp)
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderOutcome, TransportError> {
        let body = OrderRequestBody::from(request);
        let resp: OrderResponse = self.post("/order", &body).await?;
        wire::normalize_order(resp)
    }

    async fn choose_substitution(
        &self,
        conversation_id: &str,
        item: &str,
    ) -> Result<SubstitutionOutcome, TransportError> {
        let body = SubstituteRequestBody {
            conversation_id,
            substitusi: item,
        };
        let resp: SubstituteResponse = self.post("/order/substitute", &body).await?;
        wire::normalize_substitution(resp)
    }

    async fn confirm_order(&self, conversation_id: &str) -> Result<FinalRecord, TransportError> {
        let body = ConfirmRequestBody { conversation_id };
        let resp: ConfirmResponse = self.post("/order/confirm", &body).await?;
        Ok(wire::normalize_final(resp, conversation_id))
    }

    async fn query_logs(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<LogEntry>, TransportError> {
        let id = conversation_id.map(str::trim).filter(|id| !id.is_empty());
        self.get(self.logs_url(id)?).await
    }
}
