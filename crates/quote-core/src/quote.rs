//! Quote model and validation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QuoteError, Result};

/// A `(text, category)` pair, the unit of content
///
/// Serialized as `{"text": ..., "category": ...}` both in the durable store
/// and in export documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    /// Quote text
    pub text: String,
    /// Free-text category label
    pub category: String,
}

impl Quote {
    /// Build a quote from user input
    ///
    /// Both fields are trimmed. Fails with [`QuoteError::Validation`] if either
    /// is empty afterwards.
    pub fn new(text: impl AsRef<str>, category: impl AsRef<str>) -> Result<Self> {
        let text = text.as_ref().trim();
        let category = category.as_ref().trim();

        if text.is_empty() {
            return Err(QuoteError::Validation("quote text must not be empty".to_string()));
        }
        if category.is_empty() {
            return Err(QuoteError::Validation("category must not be empty".to_string()));
        }

        Ok(Self { text: text.to_string(), category: category.to_string() })
    }

    /// Whether both fields are non-empty after trimming
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty() && !self.category.trim().is_empty()
    }

    /// Decode one untrusted JSON element
    ///
    /// Returns `None` unless the element is an object whose `text` and
    /// `category` are non-blank strings. Values are kept verbatim so that an
    /// export can be imported back unchanged.
    pub fn from_value(value: &Value) -> Option<Self> {
        let text = value.get("text")?.as_str()?;
        let category = value.get("category")?.as_str()?;

        let quote = Self { text: text.to_string(), category: category.to_string() };
        quote.is_valid().then_some(quote)
    }

    /// Case-insensitive equality on both fields
    pub fn same_entry(&self, other: &Quote) -> bool {
        self.text.to_lowercase() == other.text.to_lowercase()
            && self.category.to_lowercase() == other.category.to_lowercase()
    }
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" ({})", self.text, self.category)
    }
}

/// Built-in quotes used when the durable store has nothing usable
pub fn seed_quotes() -> Vec<Quote> {
    [
        ("The best way to get started is to quit talking and begin doing.", "Motivation"),
        ("Life is what happens when you're busy making other plans.", "Life"),
        (
            "Success is not final, failure is not fatal: It is the courage to continue that counts.",
            "Success",
        ),
    ]
    .into_iter()
    .map(|(text, category)| Quote { text: text.to_string(), category: category.to_string() })
    .collect()
}
