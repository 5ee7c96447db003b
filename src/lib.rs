//! Quote generator
//!
//! Facade over the workspace crates. [`QuoteApp`] wires the durable store,
//! the remembered filter, the session memory and the sync engine together
//! so a presentation layer only has to call into one type.
//!
//! # Example
//!
//! ```no_run
//! use quote_generator::{CategoryFilter, QuoteApp, QuoteConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut app = QuoteApp::open(QuoteConfig::new("./data"))?;
//!
//!     app.add_quote("Stay hungry, stay foolish.", "Life")?;
//!     let filter = app.restore_filter();
//!     if let Some(quote) = app.show_random(&filter) {
//!         println!("{}", quote);
//!     }
//!
//!     app.sync().sync_once().await.ok();
//!     app.select_filter(&CategoryFilter::All)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use networking::{HttpClient, HttpClientConfig, RetryPolicy};
pub use quote_core::codec::{self, ExportArtifact, ImportSummary};
pub use quote_core::{
    CategoryFilter, FilterPreference, HttpQuoteSource, LastViewed, Quote, QuoteError,
    QuoteSource, QuoteStore, RandomSelector, RemoteRecord, SharedQuoteStore, SyncConfig,
    SyncEngine, SyncError, SyncHandle, SyncReport, SyncStatus,
};
pub use storage::{KvConfig, KvStore};

/// File name of the durable database inside the data directory
pub const DATABASE_FILE: &str = "quotes.db";

/// Application configuration
#[derive(Debug, Clone)]
pub struct QuoteConfig {
    /// Directory holding the durable store
    pub data_dir: PathBuf,
    /// Remote synchronization settings
    pub sync: SyncConfig,
    /// HTTP client settings for the remote feed
    pub http: HttpClientConfig,
}

impl QuoteConfig {
    /// Create a configuration with defaults for everything but the data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            sync: SyncConfig::default(),
            http: HttpClientConfig::default(),
        }
    }

    /// Set the synchronization settings
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Set the HTTP client settings
    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

/// The quote generator core, wired up
pub struct QuoteApp {
    store: SharedQuoteStore,
    preference: FilterPreference,
    last_viewed: LastViewed,
    selector: RandomSelector,
    sync: SyncEngine,
}

impl QuoteApp {
    /// Open the app, reading the remote feed over HTTP
    pub fn open(config: QuoteConfig) -> anyhow::Result<Self> {
        let client = HttpClient::new(config.http.clone()).context("building HTTP client")?;
        let source = HttpQuoteSource::new(client, config.sync.endpoint.clone());
        Self::open_with_source(config, Arc::new(source))
    }

    /// Open the app with a caller-supplied remote source
    pub fn open_with_source(
        config: QuoteConfig,
        source: Arc<dyn QuoteSource>,
    ) -> anyhow::Result<Self> {
        let path = config.database_path();
        let kv = Arc::new(
            KvStore::new(KvConfig::new(&path))
                .with_context(|| format!("opening quote store at {}", path.display()))?,
        );
        let session = Arc::new(KvStore::session().context("opening session store")?);

        let store = QuoteStore::load(kv.clone()).into_shared();
        let sync = SyncEngine::new(store.clone(), source, config.sync.clone());

        tracing::info!(quotes = store.lock().len(), "Quote generator ready");

        Ok(Self {
            store,
            preference: FilterPreference::new(kv),
            last_viewed: LastViewed::new(session),
            selector: RandomSelector::new(),
            sync,
        })
    }

    /// Shared handle to the quote store
    pub fn store(&self) -> &SharedQuoteStore {
        &self.store
    }

    /// The sync engine
    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    /// Session memory of the last displayed quote
    pub fn last_viewed(&self) -> &LastViewed {
        &self.last_viewed
    }

    /// Add a quote from user input
    pub fn add_quote(&self, text: &str, category: &str) -> Result<Quote, QuoteError> {
        self.store.lock().add(text, category)
    }

    /// Distinct categories, sorted case-insensitively
    pub fn categories(&self) -> Vec<String> {
        self.store.lock().categories()
    }

    /// Quotes passing `filter`
    pub fn list(&self, filter: &CategoryFilter) -> Vec<Quote> {
        self.store.lock().list(filter)
    }

    /// Pick a random quote under `filter` and remember it for the session
    pub fn show_random(&mut self, filter: &CategoryFilter) -> Option<Quote> {
        let pool = self.list(filter);
        let quote = self.selector.pick(&pool, filter).cloned()?;

        if let Err(e) = self.last_viewed.remember(&quote) {
            tracing::debug!("Could not remember last viewed quote: {}", e);
        }
        Some(quote)
    }

    /// Persist the selected filter
    pub fn select_filter(&self, filter: &CategoryFilter) -> Result<(), QuoteError> {
        self.preference.save(filter)
    }

    /// The remembered filter, resolved against the current categories
    pub fn restore_filter(&self) -> CategoryFilter {
        self.preference.restore(&self.categories())
    }

    /// Export the whole collection as `quotes.json`
    pub fn export(&self) -> Result<ExportArtifact, QuoteError> {
        codec::export(self.store.lock().quotes())
    }

    /// Export the whole collection into `dir`
    pub async fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, QuoteError> {
        let artifact = self.export()?;
        artifact.write_to_dir(dir).await
    }

    /// Import an uploaded JSON document
    pub fn import(&self, raw: &str) -> Result<ImportSummary, QuoteError> {
        codec::import(raw, &mut self.store.lock())
    }

    /// Start the recurring sync at the configured interval
    pub fn start_sync(&self) -> SyncHandle {
        self.sync.schedule_recurring(self.sync.config().interval)
    }
}
