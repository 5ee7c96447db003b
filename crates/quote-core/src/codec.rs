//! JSON import and export of the quote collection

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{QuoteError, Result};
use crate::quote::Quote;
use crate::store::QuoteStore;

/// File name of the export artifact
pub const EXPORT_FILE_NAME: &str = "quotes.json";

/// A downloadable export document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name
    pub file_name: String,
    /// 2-space-indented JSON array of quotes
    pub contents: String,
}

impl ExportArtifact {
    /// Write the artifact into `dir`, returning the full path
    pub async fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        tokio::fs::write(&path, self.contents.as_bytes()).await?;
        Ok(path)
    }
}

/// Serialize `quotes` into an export artifact, preserving order
pub fn export(quotes: &[Quote]) -> Result<ExportArtifact> {
    let contents = serde_json::to_string_pretty(quotes)?;
    Ok(ExportArtifact { file_name: EXPORT_FILE_NAME.to_string(), contents })
}

/// Validated content of an import document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImport {
    /// Elements that passed validation, in document order
    pub quotes: Vec<Quote>,
    /// Elements skipped because they were malformed or blank
    pub invalid: usize,
}

/// Parse an import document
///
/// Fails with [`QuoteError::Format`] when the text is not JSON or its top
/// level is not an array. Malformed elements are counted and skipped.
pub fn parse(raw: &str) -> Result<ParsedImport> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| QuoteError::Format(format!("not valid JSON: {}", e)))?;

    let Value::Array(items) = value else {
        return Err(QuoteError::Format("expected a JSON array of quotes".to_string()));
    };

    let mut parsed = ParsedImport::default();
    for item in &items {
        match Quote::from_value(item) {
            Some(quote) => parsed.quotes.push(quote),
            None => parsed.invalid += 1,
        }
    }

    Ok(parsed)
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Quotes appended to the store
    pub imported: usize,
    /// Elements dropped by validation
    pub skipped_invalid: usize,
    /// Elements matching a quote already in the store
    pub skipped_duplicate: usize,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Imported {} quote(s)", self.imported)?;
        let skipped = self.skipped_invalid + self.skipped_duplicate;
        if skipped > 0 {
            write!(f, ", skipped {}", skipped)?;
        }
        Ok(())
    }
}

/// Import `raw` into `store`
///
/// Elements matching a quote already in the store (ignoring case) are
/// skipped; everything else is appended in document order, repeats within
/// the document included. The store is not touched when parsing fails.
pub fn import(raw: &str, store: &mut QuoteStore) -> Result<ImportSummary> {
    let parsed = parse(raw)?;
    let mut summary = ImportSummary { skipped_invalid: parsed.invalid, ..Default::default() };
    let parsed_len = parsed.quotes.len();

    let existing = store.quotes();
    let fresh: Vec<Quote> = parsed
        .quotes
        .into_iter()
        .filter(|quote| !existing.iter().any(|known| known.same_entry(quote)))
        .collect();

    summary.skipped_duplicate = parsed_len - fresh.len();
    summary.imported = fresh.len();

    let mut merged = existing.to_vec();
    merged.extend(fresh);
    if summary.imported > 0 {
        store.replace_all(merged)?;
    }

    tracing::info!(
        imported = summary.imported,
        skipped_invalid = summary.skipped_invalid,
        skipped_duplicate = summary.skipped_duplicate,
        "Imported quotes"
    );
    Ok(summary)
}
