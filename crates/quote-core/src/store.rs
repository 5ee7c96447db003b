//! Authoritative quote collection with durable persistence
//!
//! The store keeps the collection in memory and writes the whole of it back
//! to the durable key-value store after every mutation, flushing before the
//! call returns.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use storage::KvStore;

use crate::error::{QuoteError, Result};
use crate::filter::CategoryFilter;
use crate::quote::{seed_quotes, Quote};

/// Durable key holding the JSON array of quotes
pub const QUOTES_KEY: &str = "dqg_quotes_v1";

/// Store handle shared between the presentation layer and the sync engine
///
/// The lock is only ever held for synchronous work, never across an await.
pub type SharedQuoteStore = Arc<Mutex<QuoteStore>>;

/// Owns the quote collection
pub struct QuoteStore {
    kv: Arc<KvStore>,
    quotes: Vec<Quote>,
}

impl QuoteStore {
    /// Load the collection from the durable store
    ///
    /// Never fails: a missing key or an undecodable payload yields the seed
    /// quotes, and stored entries that do not validate are dropped.
    pub fn load(kv: Arc<KvStore>) -> Self {
        let quotes = match kv.get::<Value>(QUOTES_KEY) {
            Ok(Some(Value::Array(items))) => {
                let quotes: Vec<Quote> = items.iter().filter_map(Quote::from_value).collect();
                if quotes.len() < items.len() {
                    tracing::warn!(
                        dropped = items.len() - quotes.len(),
                        "Dropped invalid stored quotes"
                    );
                }
                quotes
            }
            Ok(Some(_)) => {
                tracing::warn!("Stored quotes are not an array, using seed quotes");
                seed_quotes()
            }
            Ok(None) => {
                tracing::debug!("No stored quotes, using seed quotes");
                seed_quotes()
            }
            Err(e) => {
                tracing::warn!("Stored quotes are unreadable ({}), using seed quotes", e);
                seed_quotes()
            }
        };

        Self { kv, quotes }
    }

    /// Wrap this store for sharing with the sync engine
    pub fn into_shared(self) -> SharedQuoteStore {
        Arc::new(Mutex::new(self))
    }

    /// Add a quote from user input
    ///
    /// Inputs are trimmed. Fails with [`QuoteError::Validation`] on empty
    /// fields and [`QuoteError::Duplicate`] when an entry with the same text
    /// and category (ignoring case) exists; the collection is unchanged in
    /// both cases.
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote> {
        let quote = Quote::new(text, category)?;

        if self.quotes.iter().any(|existing| existing.same_entry(&quote)) {
            return Err(QuoteError::Duplicate { text: quote.text, category: quote.category });
        }

        self.quotes.push(quote.clone());
        if let Err(e) = self.persist() {
            self.quotes.pop();
            return Err(e);
        }

        tracing::debug!(category = %quote.category, "Added quote");
        Ok(quote)
    }

    /// Quotes passing `filter`, in collection order
    pub fn list(&self, filter: &CategoryFilter) -> Vec<Quote> {
        self.quotes.iter().filter(|quote| filter.matches(quote)).cloned().collect()
    }

    /// Distinct categories, sorted case-insensitively
    ///
    /// Categories that differ only in case are all kept and stay in the order
    /// they first appear in the collection.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for quote in &self.quotes {
            if !categories.contains(&quote.category) {
                categories.push(quote.category.clone());
            }
        }

        categories.sort_by_cached_key(|category| category.to_lowercase());
        categories
    }

    /// Replace the whole collection and persist it
    ///
    /// Entries that do not validate are dropped. On a storage failure the
    /// previous collection is kept.
    pub fn replace_all(&mut self, quotes: Vec<Quote>) -> Result<()> {
        let incoming: Vec<Quote> = quotes.into_iter().filter(Quote::is_valid).collect();
        let previous = std::mem::replace(&mut self.quotes, incoming);

        if let Err(e) = self.persist() {
            self.quotes = previous;
            return Err(e);
        }

        tracing::debug!(count = self.quotes.len(), "Replaced quote collection");
        Ok(())
    }

    /// The full collection
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    /// Number of quotes
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    fn persist(&self) -> Result<()> {
        self.kv.set(QUOTES_KEY, &self.quotes)?;
        self.kv.flush()?;
        Ok(())
    }
}
