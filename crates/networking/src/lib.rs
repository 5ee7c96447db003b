//! Networking utilities for the quote generator
//!
//! This crate provides the HTTP client used to read the remote quote feed,
//! with retry logic for transient failures and timeout handling.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod retry;

pub use client::{HttpClient, HttpClientConfig, HttpError};
pub use retry::RetryPolicy;
