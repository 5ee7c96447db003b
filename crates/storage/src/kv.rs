//! Keyed JSON storage over sled
//!
//! Every value lives under a string key and is encoded as JSON, so the
//! durable layout stays readable and stable across releases. Two flavours
//! share one type: a durable store opened from a [`KvConfig`], and a session
//! store that lives only as long as the process holds it.

use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`KvStore`]
#[derive(Debug, Error)]
pub enum KvError {
    /// The underlying database failed
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// A value could not be encoded for storage
    #[error("Cannot encode value for '{key}': {source}")]
    Encode {
        /// Key being written
        key: String,
        /// Encoder failure
        #[source]
        source: serde_json::Error,
    },

    /// A stored value could not be decoded into the requested type
    #[error("Cannot decode value under '{key}': {source}")]
    Decode {
        /// Key being read
        key: String,
        /// Decoder failure
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Durable store settings
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Directory sled keeps its files in
    pub path: PathBuf,
    /// Page cache size in bytes
    pub cache_capacity: u64,
    /// Compress pages on disk
    pub use_compression: bool,
    /// Background flush period in milliseconds, `None` to flush only on demand
    pub flush_every_ms: Option<u64>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("quotes.db"),
            cache_capacity: 4 * 1024 * 1024,
            use_compression: true,
            flush_every_ms: Some(500),
        }
    }
}

impl KvConfig {
    /// Settings for a store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }
}

/// Keyed JSON store
///
/// Cloning is cheap and yields a handle to the same database.
#[derive(Clone)]
pub struct KvStore {
    db: sled::Db,
    durable: bool,
}

impl KvStore {
    /// Open (or create) the durable store described by `config`
    pub fn new(config: KvConfig) -> Result<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression)
            .flush_every_ms(config.flush_every_ms)
            .open()?;

        tracing::debug!(path = %config.path.display(), "Opened durable store");
        Ok(Self { db, durable: true })
    }

    /// Open a session store
    ///
    /// Nothing written here outlives the last handle. Tests use it as a
    /// throwaway durable store too.
    pub fn session() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db, durable: false })
    }

    /// Read and decode the value under `key`
    ///
    /// A missing key is `Ok(None)`; a present but undecodable one is
    /// [`KvError::Decode`].
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.db.get(key)? else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| KvError::Decode { key: key.to_string(), source })
    }

    /// Encode and write `value` under `key`, replacing what was there
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|source| KvError::Encode { key: key.to_string(), source })?;
        self.db.insert(key, bytes)?;
        Ok(())
    }

    /// Write `bytes` under `key` without encoding them
    pub fn set_raw(&self, key: &str, bytes: impl AsRef<[u8]>) -> Result<()> {
        self.db.insert(key, bytes.as_ref())?;
        Ok(())
    }

    /// Delete `key`, returning whether it was present
    pub fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.db.remove(key)?.is_some())
    }

    /// Block until pending writes reach disk
    ///
    /// A no-op for session stores.
    pub fn flush(&self) -> Result<()> {
        if self.durable {
            self.db.flush()?;
        }
        Ok(())
    }
}
