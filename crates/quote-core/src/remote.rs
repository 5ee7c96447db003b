//! Remote quote source
//!
//! The sync engine only sees the [`QuoteSource`] trait. [`HttpQuoteSource`]
//! is the production implementation reading a JSON feed over HTTP.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use networking::HttpClient;

use crate::error::SyncError;
use crate::quote::Quote;

/// One record of the remote feed
///
/// Only `title` is used; every other field of the feed is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Record title, which becomes the quote text
    pub title: String,
}

impl RemoteRecord {
    /// Create a record with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    /// Map this record to a quote under the remote-origin category
    ///
    /// The title is taken verbatim; the feed's own categorisation, if any, is
    /// never consulted.
    pub fn to_quote(&self, remote_category: &str) -> Quote {
        Quote { text: self.title.clone(), category: remote_category.to_string() }
    }
}

/// Supplier of raw remote records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the current feed, in feed order
    async fn fetch_records(&self) -> Result<Vec<RemoteRecord>, SyncError>;
}

/// Reads remote records with an HTTP GET against a fixed endpoint
pub struct HttpQuoteSource {
    client: HttpClient,
    endpoint: String,
}

impl HttpQuoteSource {
    /// Create a source for `endpoint`
    pub fn new(client: HttpClient, endpoint: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into() }
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_records(&self) -> Result<Vec<RemoteRecord>, SyncError> {
        tracing::debug!(endpoint = %self.endpoint, "Fetching remote quotes");
        let records: Vec<RemoteRecord> = self.client.get_json_with_retry(&self.endpoint).await?;
        Ok(records)
    }
}
