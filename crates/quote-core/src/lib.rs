//! Core quote logic for the quote generator
//!
//! This crate owns the quote collection and everything that reads or
//! rewrites it: validation, durable storage, category filtering with a
//! remembered preference, random selection, JSON import/export and the
//! remote synchronization engine.
//!
//! Rendering is not handled here. A presentation layer calls into these
//! types and listens to [`sync::SyncEngine::subscribe`] for status updates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod filter;
pub mod quote;
pub mod remote;
pub mod selector;
pub mod session;
pub mod store;
pub mod sync;

pub use codec::{ExportArtifact, ImportSummary};
pub use error::{QuoteError, Result, SyncError};
pub use filter::{CategoryFilter, FilterPreference};
pub use quote::Quote;
pub use remote::{HttpQuoteSource, QuoteSource, RemoteRecord};
pub use selector::RandomSelector;
pub use session::LastViewed;
pub use store::{QuoteStore, SharedQuoteStore};
pub use sync::{SyncConfig, SyncEngine, SyncHandle, SyncReport, SyncStatus};
