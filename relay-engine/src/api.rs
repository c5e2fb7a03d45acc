//! HTTP client for the RelayCRM sync endpoints.
//!
//! The engine consumes the server only through [`SyncApi`]; the trait seam
//! keeps the pager and facade testable without a live server.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use shared::{
    config::Config,
    models::{ErrorResponse, HistoryPageResponse, MarkReadRequest, UnreadSnapshotResponse},
};
use url::Url;
use uuid::Uuid;

use crate::error::{Result, SyncError};

/// Request surface the engine needs from the server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncApi: Send + Sync {
    /// Fetches the bulk unread snapshot. Consumed once at startup.
    async fn fetch_unread_snapshot(&self) -> Result<UnreadSnapshotResponse>;

    /// Fetches one page of conversation history at the given offset.
    /// `mark_read` asks the server to clear the unread counter as a side
    /// effect (used for the first page when a view opens).
    async fn fetch_history_page(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
        mark_read: bool,
    ) -> Result<HistoryPageResponse>;

    /// Fire-and-forget mark-read command. No response payload is required.
    async fn mark_read(&self, conversation_id: Uuid) -> Result<()>;
}

/// [`SyncApi`] implementation over the RelayCRM REST API.
#[derive(Debug, Clone)]
pub struct HttpSyncApi {
    client: Client,
    api_base: Url,
    token: Option<String>,
}

impl HttpSyncApi {
    /// Builds an API client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let api_base = config.server_url.join("api/")?;
        Ok(Self {
            client: Client::new(),
            api_base,
            token: config.api_token.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.as_ref().ok_or(SyncError::MissingCredential)?;
        Ok(request.bearer_auth(token))
    }

    async fn checked(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map_or(body, |error| error.to_string());
        Err(SyncError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SyncApi for HttpSyncApi {
    async fn fetch_unread_snapshot(&self) -> Result<UnreadSnapshotResponse> {
        let endpoint = self.api_base.join("conversations/unread")?;
        let request = self.authorized(self.client.get(endpoint))?;
        let response = Self::checked(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn fetch_history_page(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
        mark_read: bool,
    ) -> Result<HistoryPageResponse> {
        let endpoint = self
            .api_base
            .join(&format!("conversations/{conversation_id}/messages"))?;
        let request = self.authorized(self.client.get(endpoint))?.query(&[
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("mark_read", mark_read.to_string()),
        ]);
        let response = Self::checked(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn mark_read(&self, conversation_id: Uuid) -> Result<()> {
        let endpoint = self
            .api_base
            .join(&format!("conversations/{conversation_id}/read"))?;
        let request = self
            .authorized(self.client.post(endpoint))?
            .json(&MarkReadRequest { conversation_id });
        Self::checked(request.send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: Option<&str>) -> Config {
        let mut config = Config::with_defaults();
        config.api_token = token.map(str::to_string);
        config
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let api = HttpSyncApi::new(&config_with_token(None)).unwrap();

        let result = api.fetch_unread_snapshot().await;
        assert!(matches!(result, Err(SyncError::MissingCredential)));

        let result = api.mark_read(Uuid::new_v4()).await;
        assert!(matches!(result, Err(SyncError::MissingCredential)));
    }

    #[test]
    fn api_base_resolves_under_server_url() {
        let mut config = config_with_token(Some("t"));
        config.server_url = Url::parse("https://crm.example.com/tenant/").unwrap();

        let api = HttpSyncApi::new(&config).unwrap();
        assert_eq!(api.api_base.as_str(), "https://crm.example.com/tenant/api/");
    }
}
