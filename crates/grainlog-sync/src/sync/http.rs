//! HTTP implementation of the remote store.
//!
//! Speaks a PostgREST-style REST dialect: one resource per table under the
//! configured endpoint root, upserts via `POST` with merge-duplicates
//! preference, soft deletes via `PATCH`, pulls via filtered `GET`.

use crate::config::RemoteConfig;
use crate::error::Result;
use crate::models::{Record, SyncTable};
use crate::sync::remote::{RemoteError, RemoteResult, RemoteStore};
use crate::util::compact_text;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// HTTP remote store client.
pub struct HttpRemote {
    config: RemoteConfig,
    client: reqwest::Client,
}

impl HttpRemote {
    /// Create a client for the given remote configuration
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, client })
    }

    fn table_url(&self, table: SyncTable) -> String {
        format!("{}/{}", self.config.endpoint, table.as_str())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
    }

    async fn check(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, &body))
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn upsert(&self, table: SyncTable, record: &Record) -> RemoteResult<()> {
        let response = self
            .authorize(self.client.post(self.table_url(table)))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(record)
            .send()
            .await
            .map_err(transport_error)?;

        Self::check(response).await?;
        Ok(())
    }

    async fn soft_delete(
        &self,
        table: SyncTable,
        id: &str,
        deleted_at: i64,
        updated_at: i64,
    ) -> RemoteResult<()> {
        let response = self
            .authorize(self.client.patch(self.table_url(table)))
            .query(&[("id", format!("eq.{id}"))])
            .json(&serde_json::json!({
                "deleted_at": deleted_at,
                "updated_at": updated_at,
            }))
            .send()
            .await
            .map_err(transport_error)?;

        Self::check(response).await?;
        Ok(())
    }

    async fn pull(&self, table: SyncTable, user_id: &str, since: i64) -> RemoteResult<Vec<Record>> {
        let response = self
            .authorize(self.client.get(self.table_url(table)))
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("updated_at", format!("gt.{since}")),
                ("order", "updated_at.asc".to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let response = Self::check(response).await?;
        response
            .json::<Vec<Record>>()
            .await
            .map_err(|e| RemoteError::Permanent(format!("invalid pull payload: {e}")))
    }
}

/// All transport-level failures (connect, timeout, TLS) are retryable
fn transport_error(error: reqwest::Error) -> RemoteError {
    RemoteError::Transient(error.to_string())
}

/// Map an HTTP error status onto the retry taxonomy
fn map_status(status: StatusCode, body: &str) -> RemoteError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RemoteError::Transient(format!("HTTP {}", status.as_u16()))
    } else {
        RemoteError::Permanent(parse_api_error(status, body))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_joins_endpoint_and_table() {
        let remote = HttpRemote::new(
            RemoteConfig::new("https://api.example.com/rest/v1/", "key").unwrap(),
        )
        .unwrap();
        assert_eq!(
            remote.table_url(SyncTable::Rolls),
            "https://api.example.com/rest/v1/rolls"
        );
    }

    #[test]
    fn test_server_errors_are_transient() {
        assert!(map_status(StatusCode::INTERNAL_SERVER_ERROR, "").is_transient());
        assert!(map_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(map_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        let error = map_status(
            StatusCode::BAD_REQUEST,
            r#"{"message": "invalid input syntax"}"#,
        );
        assert!(!error.is_transient());
        assert_eq!(
            error.to_string(),
            "permanent remote error: invalid input syntax (400)"
        );
    }

    #[test]
    fn test_parse_api_error_falls_back_to_body_text() {
        assert_eq!(
            parse_api_error(StatusCode::CONFLICT, "duplicate key"),
            "duplicate key (409)"
        );
        assert_eq!(parse_api_error(StatusCode::FORBIDDEN, ""), "HTTP 403");
    }
}
