//! Transport for pulling a remote key set document.

use crate::error::TokenError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// Fetches the raw bytes of a key set document.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    /// Fetch the document published at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TokenError>;
}

/// HTTP fetcher backed by `reqwest`.
///
/// Timeouts, connection failures and non-success statuses all surface as
/// [`TokenError::KeySetFetch`].
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    client: reqwest::Client,
}

impl HttpKeySetFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, TokenError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TokenError::config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TokenError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TokenError::fetch(format!("Failed to fetch JWKS: {e}")))?;

        if !response.status().is_success() {
            return Err(TokenError::fetch(format!(
                "JWKS fetch failed with status: {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TokenError::fetch(format!("Failed to read JWKS body: {e}")))?;
        Ok(body.to_vec())
    }
}
