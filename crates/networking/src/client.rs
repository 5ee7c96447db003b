//! HTTP client for JSON feeds
//!
//! Wraps `reqwest` with the timeout, user agent and retry policy the quote
//! generator uses when talking to its remote source.

use reqwest::{Client as ReqwestClient, Response as ReqwestResponse};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::retry::{with_backoff, RetryPolicy};

/// HTTP error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The request could not be built or sent (connect failure, timeout, ...)
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The response body was not the expected JSON shape
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl HttpError {
    /// Check if this error is worth retrying
    ///
    /// Transport failures are always retried; of the HTTP statuses only the
    /// ones that signal a temporary condition are.
    pub fn is_transient(&self) -> bool {
        match self {
            HttpError::Request(_) => true,
            HttpError::Status { status, .. } => {
                matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524)
            }
            HttpError::Decode(_) => false,
        }
    }
}

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Headers to include in all requests
    pub default_headers: HashMap<String, String>,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: format!("quote-generator/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpClientConfig {
    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// HTTP client for fetching JSON documents
///
/// # Examples
/// ```no_run
/// use networking::{HttpClient, HttpClientConfig};
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let client = HttpClient::new(HttpClientConfig::default())?;
///     let posts: serde_json::Value = client
///         .get_json_with_retry("https://jsonplaceholder.typicode.com/posts")
///         .await?;
///     println!("{}", posts);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| HttpError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// GET `url` and decode the body as JSON, single attempt
    pub async fn get_json<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut req = self.client.get(url);
        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;

        Self::parse_response(response).await
    }

    /// GET `url` and decode the body as JSON, retrying transient failures
    pub async fn get_json_with_retry<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        with_backoff(&self.config.retry, HttpError::is_transient, || self.get_json(url)).await
    }

    async fn parse_response<T>(response: ReqwestResponse) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status { status: status.as_u16(), body });
        }

        let body = response
            .text()
            .await
            .map_err(|e| HttpError::Request(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| HttpError::Decode(e.to_string()))
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(HttpError::Request("connection refused".to_string()).is_transient());
        assert!(HttpError::Status { status: 503, body: String::new() }.is_transient());
        assert!(HttpError::Status { status: 429, body: String::new() }.is_transient());
        assert!(!HttpError::Status { status: 404, body: String::new() }.is_transient());
        assert!(!HttpError::Decode("expected array".to_string()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let error = HttpError::Status { status: 500, body: "boom".to_string() };
        let display = error.to_string();
        assert!(display.contains("500"));
        assert!(display.contains("boom"));
    }

    #[test]
    fn test_client_config_default() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("quote-generator/"));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_client_config_builder() {
        let config = HttpClientConfig::default()
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("QuoteTest/1.0")
            .with_header("X-Custom", "value")
            .with_retry(RetryPolicy::none());

        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "QuoteTest/1.0");
        assert_eq!(config.default_headers.get("X-Custom"), Some(&"value".to_string()));
        assert_eq!(config.retry.max_retries, 0);

        let client = HttpClient::new(config).unwrap();
        assert_eq!(client.config().user_agent, "QuoteTest/1.0");
    }
}
