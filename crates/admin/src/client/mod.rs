//! Typed REST client for the admin API.
//!
//! Used by the CLI `export` command and the integration tests. The client
//! keeps cookies, so with demo login enabled the first request logs in and
//! later requests reuse the session.

mod retry;

pub use retry::{RetryPolicy, with_retry};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;
use url::Url;
/// Errors from the admin API client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with an error body.
    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Gave up after {0} attempts")]
    RetriesExhausted(u32),
}

/// Client for the admin JSON API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` for a malformed URL.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET `path` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` for a non-success response.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("error")?.as_str().map(ToOwned::to_owned))
                .unwrap_or_default();
            return Err(ClientError::Status { status, message });
        }
        Ok(response.json().await?)
    }

    /// GET `path`, retrying failures under the client's policy.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::RetriesExhausted` once every attempt failed.
    pub async fn get_with_retry<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        with_retry(self.retry, || self.get(path))
            .await
            .ok_or(ClientError::RetriesExhausted(self.retry.attempts))
    }

    /// Whether `/health/ready` answers 200.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Request` if the server cannot be reached.
    pub async fn ready(&self) -> Result<bool, ClientError> {
        let url = self.base_url.join("/health/ready")?;
        Ok(self.client.get(url).send().await?.status() == StatusCode::OK)
    }

    /// The logged-in staff member.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` with 401 when there is no session.
    pub async fn session(&self) -> Result<Value, ClientError> {
        self.get("/api/session").await
    }

    /// Every row of a list endpoint, e.g. `/api/residents`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::RetriesExhausted` once every attempt failed.
    pub async fn list(&self, path: &str) -> Result<Vec<Value>, ClientError> {
        self.get_with_retry(path).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_exhausts_retries() {
        let client = ApiClient::new("http://127.0.0.1:1")
            .unwrap()
            .with_retry_policy(RetryPolicy {
                attempts: 2,
                delay: std::time::Duration::ZERO,
            });
        let result = client.list("/api/residents").await;
        assert!(matches!(result, Err(ClientError::RetriesExhausted(2))));
    }
}
