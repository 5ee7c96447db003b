//! Storage layer for the quote generator
//!
//! This crate provides the durable key-value store that backs the quote
//! collection and filter preference, and the session-scoped store used for
//! short-lived view state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;

pub use kv::{KvConfig, KvError, KvStore};
