//! Category filter and the remembered filter preference

use std::fmt;
use std::sync::Arc;

use storage::KvStore;

use crate::error::Result;
use crate::quote::Quote;

/// Durable key for the last selected filter
pub const LAST_FILTER_KEY: &str = "dqg_last_filter";

/// Sentinel string meaning "no category filter"
pub const ALL_CATEGORIES: &str = "all";

/// Which quotes a listing should include
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    /// Every quote
    #[default]
    All,
    /// Only quotes whose category matches exactly
    Category(String),
}

impl CategoryFilter {
    /// Parse a filter string; `"all"` is the sentinel for [`CategoryFilter::All`]
    pub fn parse(value: &str) -> Self {
        if value == ALL_CATEGORIES {
            CategoryFilter::All
        } else {
            CategoryFilter::Category(value.to_string())
        }
    }

    /// String form, as persisted
    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Category(category) => category,
        }
    }

    /// Check whether a quote passes this filter (case-sensitive)
    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(category) => quote.category == *category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for CategoryFilter {
    fn from(value: &str) -> Self {
        CategoryFilter::parse(value)
    }
}

/// Remembers the last selected category across restarts
pub struct FilterPreference {
    kv: Arc<KvStore>,
}

impl FilterPreference {
    /// Create a preference backed by the durable store
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }

    /// Persist `filter`, overwriting the previous value
    pub fn save(&self, filter: &CategoryFilter) -> Result<()> {
        self.kv.set(LAST_FILTER_KEY, filter.as_str())?;
        self.kv.flush()?;
        Ok(())
    }

    /// Read the remembered filter, resolved against the current categories
    ///
    /// Falls back to [`CategoryFilter::All`] when nothing is stored, the
    /// stored value is unreadable, or the category no longer exists.
    pub fn restore(&self, valid_categories: &[String]) -> CategoryFilter {
        let stored: Option<String> = match self.kv.get(LAST_FILTER_KEY) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring unreadable filter preference: {}", e);
                None
            }
        };

        match stored.map(|value| CategoryFilter::parse(&value)) {
            Some(CategoryFilter::Category(category))
                if valid_categories.iter().any(|c| *c == category) =>
            {
                CategoryFilter::Category(category)
            }
            _ => CategoryFilter::All,
        }
    }
}
