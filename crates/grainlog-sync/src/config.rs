//! Remote store configuration.

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Configuration for the HTTP remote store.
///
/// `endpoint` is the REST root the per-table resources hang off, e.g.
/// `https://xyz.example.co/rest/v1`.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl RemoteConfig {
    /// Create a validated configuration.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        let api_key = normalize_text_option(Some(api_key.into()))
            .ok_or_else(|| Error::InvalidInput("api key must not be empty".to_string()))?;
        Ok(Self { endpoint, api_key })
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("endpoint must not be empty".to_string()))?;
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}
