//! Remote synchronization
//!
//! A sync cycle fetches the remote feed, maps its first few records to
//! quotes, merges them into the local collection and persists the result.
//!
//! Merge rule: the local and remote quotes are concatenated (local first)
//! and keyed by their exact text. The first occurrence of a key fixes its
//! position in the result; the last occurrence supplies the value. A remote
//! quote whose text matches a local one therefore replaces it in place, and
//! remote quotes with new text are appended in feed order.
//!
//! Cycles never overlap. A trigger that arrives while a cycle is running is
//! rejected with [`SyncError::InProgress`], and the recurring schedule simply
//! skips that tick.

use parking_lot::Mutex as SyncMutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::SyncError;
use crate::quote::Quote;
use crate::remote::QuoteSource;
use crate::store::SharedQuoteStore;

/// Default remote feed
pub const DEFAULT_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";

/// Default period of the recurring sync
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Records considered per cycle
pub const MAX_REMOTE_RECORDS: usize = 5;

/// Shortest period the recurring sync accepts
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_millis(1);

/// Category assigned to every quote that came from the remote feed
pub const REMOTE_CATEGORY: &str = "Server";

/// Configuration for remote synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote feed URL
    pub endpoint: String,
    /// Period of the recurring sync
    pub interval: Duration,
    /// Maximum number of remote records considered per cycle
    pub max_records: usize,
    /// Category label marking remote origin
    pub remote_category: String,
    /// Capacity of the status broadcast channel
    pub status_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            interval: DEFAULT_SYNC_INTERVAL,
            max_records: MAX_REMOTE_RECORDS,
            remote_category: REMOTE_CATEGORY.to_string(),
            status_buffer: 16,
        }
    }
}

impl SyncConfig {
    /// Create a configuration for a custom endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), ..Default::default() }
    }

    /// Set the recurring sync period
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the per-cycle record cap
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }
}

/// Progress of a sync cycle, as reported to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// A cycle has started
    Syncing,
    /// The last cycle completed and its result was persisted
    Succeeded,
    /// The last cycle failed; the local collection was left untouched
    Failed(String),
}

impl SyncStatus {
    /// Human-readable status line
    pub fn message(&self) -> String {
        match self {
            SyncStatus::Syncing => "Syncing with server...".to_string(),
            SyncStatus::Succeeded => "Quotes synced with server.".to_string(),
            SyncStatus::Failed(reason) => format!("Sync failed: {}", reason),
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Result of merging remote quotes into the local collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The merged collection
    pub quotes: Vec<Quote>,
    /// Remote quotes appended as new entries
    pub added: usize,
    /// Remote quotes that replaced a local quote with the same text
    pub updated: usize,
    /// Replacements that changed the stored category
    pub conflicts: usize,
}

/// Merge `remote` into `local` by exact text
pub fn merge(local: &[Quote], remote: &[Quote]) -> MergeOutcome {
    let mut quotes: Vec<Quote> = Vec::with_capacity(local.len() + remote.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for quote in local {
        match positions.get(quote.text.as_str()) {
            Some(&i) => quotes[i] = quote.clone(),
            None => {
                positions.insert(quote.text.as_str(), quotes.len());
                quotes.push(quote.clone());
            }
        }
    }

    let collapsed = quotes.clone();
    let mut replaced: HashSet<usize> = HashSet::new();

    for quote in remote {
        match positions.get(quote.text.as_str()) {
            Some(&i) => {
                if i < collapsed.len() {
                    replaced.insert(i);
                }
                quotes[i] = quote.clone();
            }
            None => {
                positions.insert(quote.text.as_str(), quotes.len());
                quotes.push(quote.clone());
            }
        }
    }

    // Each local entry counts once, however often the feed repeats its text
    let updated = replaced.len();
    let conflicts =
        replaced.iter().filter(|&&i| quotes[i].category != collapsed[i].category).count();

    MergeOutcome { added: quotes.len() - collapsed.len(), quotes, updated, conflicts }
}

/// Summary of a successful sync cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Remote records considered (after the per-cycle cap)
    pub fetched: usize,
    /// New quotes appended
    pub added: usize,
    /// Local quotes replaced by their remote version
    pub updated: usize,
    /// Replacements that changed the category
    pub conflicts: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} added, {} updated", self.added, self.updated)?;
        if self.conflicts > 0 {
            write!(f, " ({} conflict(s) resolved in favour of the server)", self.conflicts)?;
        }
        Ok(())
    }
}

/// Reconciles the local collection with the remote feed
///
/// Cloning yields another handle to the same engine; the in-progress guard
/// and the status channel are shared.
#[derive(Clone)]
pub struct SyncEngine {
    store: SharedQuoteStore,
    source: Arc<dyn QuoteSource>,
    config: SyncConfig,
    status_tx: broadcast::Sender<SyncStatus>,
    last_status: Arc<SyncMutex<Option<SyncStatus>>>,
    in_flight: Arc<Mutex<()>>,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(store: SharedQuoteStore, source: Arc<dyn QuoteSource>, config: SyncConfig) -> Self {
        let (status_tx, _status_rx) = broadcast::channel(config.status_buffer.max(1));

        Self {
            store,
            source,
            config,
            status_tx,
            last_status: Arc::new(SyncMutex::new(None)),
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Subscribe to status updates
    pub fn subscribe(&self) -> broadcast::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Most recently reported status, if any cycle has run
    pub fn status(&self) -> Option<SyncStatus> {
        self.last_status.lock().clone()
    }

    /// Whether a cycle is currently running
    pub fn is_syncing(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Get the sync configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one sync cycle
    ///
    /// Returns [`SyncError::InProgress`] without side effects if another
    /// cycle is running. Any other failure is reported as
    /// [`SyncStatus::Failed`] and leaves the store untouched.
    pub async fn sync_once(&self) -> Result<SyncReport, SyncError> {
        let _guard = self.in_flight.try_lock().map_err(|_| SyncError::InProgress)?;

        self.report(SyncStatus::Syncing);

        match self.run_cycle().await {
            Ok(report) => {
                tracing::info!(
                    fetched = report.fetched,
                    added = report.added,
                    updated = report.updated,
                    conflicts = report.conflicts,
                    "Sync completed"
                );
                self.report(SyncStatus::Succeeded);
                Ok(report)
            }
            Err(e) => {
                tracing::warn!("Sync failed: {}", e);
                self.report(SyncStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run_cycle(&self) -> Result<SyncReport, SyncError> {
        let records = self.source.fetch_records().await?;

        let considered = &records[..records.len().min(self.config.max_records)];
        let remote: Vec<Quote> = considered
            .iter()
            .map(|record| record.to_quote(&self.config.remote_category))
            .filter(Quote::is_valid)
            .collect();

        let outcome = {
            let mut store = self.store.lock();
            let outcome = merge(store.quotes(), &remote);
            let counts = (outcome.added, outcome.updated, outcome.conflicts);
            store
                .replace_all(outcome.quotes)
                .map_err(|e| SyncError::Store(e.to_string()))?;
            counts
        };

        let (added, updated, conflicts) = outcome;
        Ok(SyncReport { fetched: considered.len(), added, updated, conflicts })
    }

    fn report(&self, status: SyncStatus) {
        *self.last_status.lock() = Some(status.clone());
        // No subscribers is fine
        let _ = self.status_tx.send(status);
    }

    /// Start syncing every `interval`, in addition to on-demand cycles
    ///
    /// The first cycle runs one interval after this call. Intervals shorter
    /// than [`MIN_SYNC_INTERVAL`] are raised to it. The schedule stops when
    /// the returned handle is stopped or dropped; a cycle that is already
    /// running is allowed to finish.
    pub fn schedule_recurring(&self, interval: Duration) -> SyncHandle {
        let period = if interval < MIN_SYNC_INTERVAL {
            tracing::warn!(?interval, "Sync interval too short, using {:?}", MIN_SYNC_INTERVAL);
            MIN_SYNC_INTERVAL
        } else {
            interval
        };

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let engine = self.clone();
        let running = Arc::new(AtomicBool::new(true));
        let running_guard = RunningGuard(Arc::clone(&running));

        let handle = tokio::spawn(async move {
            // Cleared on every exit path, panics included
            let _running = running_guard;
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(SyncError::InProgress) = engine.sync_once().await {
                            tracing::debug!("Skipping scheduled sync, a cycle is already running");
                        }
                    }
                    _ = &mut stop_rx => {
                        break;
                    }
                }
            }
        });

        SyncHandle { stop_tx: Some(stop_tx), handle, running }
    }
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle for a recurring sync schedule
///
/// When dropped, the schedule is stopped.
pub struct SyncHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl SyncHandle {
    /// Check if the schedule is still active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the schedule without waiting for it to wind down
    pub fn stop(mut self) {
        self.signal_stop();
    }

    /// Stop the schedule and wait until its task has exited
    pub async fn shutdown(mut self) {
        self.signal_stop();
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!("Sync schedule task ended abnormally: {}", e);
        }
    }

    fn signal_stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockQuoteSource, RemoteRecord};
    use crate::store::{QuoteStore, QUOTES_KEY};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use storage::KvStore;
    use tokio::sync::Notify;

    fn q(text: &str, category: &str) -> Quote {
        Quote { text: text.to_string(), category: category.to_string() }
    }

    fn shared_store(quotes: &[Quote]) -> SharedQuoteStore {
        let kv = Arc::new(KvStore::session().unwrap());
        kv.set(QUOTES_KEY, quotes).unwrap();
        QuoteStore::load(kv).into_shared()
    }

    fn records(titles: &[&str]) -> Vec<RemoteRecord> {
        titles.iter().map(|t| RemoteRecord::new(*t)).collect()
    }

    fn engine_with(store: SharedQuoteStore, source: impl QuoteSource + 'static) -> SyncEngine {
        SyncEngine::new(store, Arc::new(source), SyncConfig::default())
    }

    #[test]
    fn test_merge_remote_wins_on_collision() {
        let outcome = merge(&[q("A", "x")], &[q("A", "y")]);
        assert_eq!(outcome.quotes, vec![q("A", "y")]);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.conflicts, 1);
        assert_eq!(outcome.added, 0);
    }

    #[test]
    fn test_merge_appends_new_remote_quotes() {
        let outcome = merge(&[q("A", "x")], &[q("B", "Server")]);
        assert_eq!(outcome.quotes, vec![q("A", "x"), q("B", "Server")]);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.updated, 0);
    }

    #[test]
    fn test_merge_keeps_positions() {
        let local = [q("A", "x"), q("B", "x"), q("C", "x")];
        let remote = [q("D", "Server"), q("B", "Server"), q("E", "Server")];

        let outcome = merge(&local, &remote);
        assert_eq!(
            outcome.quotes,
            vec![q("A", "x"), q("B", "Server"), q("C", "x"), q("D", "Server"), q("E", "Server")]
        );
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.updated, 1);
    }

    #[test]
    fn test_merge_key_is_exact_text() {
        let outcome = merge(&[q("A", "x")], &[q("a", "Server"), q("A ", "Server")]);
        assert_eq!(outcome.quotes.len(), 3);
        assert_eq!(outcome.quotes[0], q("A", "x"));
    }

    #[test]
    fn test_merge_last_value_wins_for_repeated_keys() {
        // Local entries sharing a text collapse too, at the first position
        let local = [q("A", "x"), q("B", "x"), q("A", "z")];
        let remote = [q("C", "Server"), q("C", "Server2")];

        let outcome = merge(&local, &remote);
        assert_eq!(outcome.quotes, vec![q("A", "z"), q("B", "x"), q("C", "Server2")]);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.updated, 0);
    }

    #[test]
    fn test_merge_counts_each_local_entry_once() {
        let outcome = merge(&[q("A", "x")], &[q("A", "Server"), q("A", "Server")]);
        assert_eq!(outcome.quotes, vec![q("A", "Server")]);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.conflicts, 1);

        // The final value decides whether the category changed
        let outcome = merge(&[q("A", "x")], &[q("A", "Server"), q("A", "x")]);
        assert_eq!(outcome.quotes, vec![q("A", "x")]);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.conflicts, 0);
    }

    #[test]
    fn test_merge_same_category_is_not_a_conflict() {
        let outcome = merge(&[q("A", "Server")], &[q("A", "Server")]);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.conflicts, 0);
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(SyncStatus::Syncing.to_string(), "Syncing with server...");
        assert_eq!(SyncStatus::Succeeded.to_string(), "Quotes synced with server.");
        assert_eq!(
            SyncStatus::Failed("timeout".to_string()).to_string(),
            "Sync failed: timeout"
        );
    }

    #[test]
    fn test_report_display() {
        let report = SyncReport { fetched: 5, added: 3, updated: 2, conflicts: 1 };
        assert_eq!(
            report.to_string(),
            "3 added, 2 updated (1 conflict(s) resolved in favour of the server)"
        );
    }

    #[tokio::test]
    async fn test_sync_once_merges_and_persists() {
        let store = shared_store(&[q("Local", "Life"), q("Shared", "Life")]);
        let mut source = MockQuoteSource::new();
        source
            .expect_fetch_records()
            .times(1)
            .returning(|| Ok(records(&["Shared", "Remote"])));

        let engine = engine_with(store.clone(), source);
        let report = engine.sync_once().await.unwrap();

        assert_eq!(report, SyncReport { fetched: 2, added: 1, updated: 1, conflicts: 1 });
        assert_eq!(
            store.lock().quotes(),
            &[q("Local", "Life"), q("Shared", "Server"), q("Remote", "Server")]
        );
        assert_eq!(engine.status(), Some(SyncStatus::Succeeded));
    }

    #[tokio::test]
    async fn test_sync_once_only_considers_first_five_records() {
        let store = shared_store(&[]);
        let mut source = MockQuoteSource::new();
        source
            .expect_fetch_records()
            .returning(|| Ok(records(&["1", "2", "3", "4", "5", "6", "7"])));

        let engine = engine_with(store.clone(), source);
        let report = engine.sync_once().await.unwrap();

        assert_eq!(report.fetched, 5);
        let texts: Vec<String> = store.lock().quotes().iter().map(|q| q.text.clone()).collect();
        assert_eq!(texts, vec!["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_sync_once_drops_blank_titles() {
        let store = shared_store(&[]);
        let mut source = MockQuoteSource::new();
        source.expect_fetch_records().returning(|| Ok(records(&["  ", "Real"])));

        let engine = engine_with(store.clone(), source);
        let report = engine.sync_once().await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.added, 1);
        assert_eq!(store.lock().quotes(), &[q("Real", "Server")]);
    }

    #[tokio::test]
    async fn test_sync_failure_leaves_store_untouched() {
        let store = shared_store(&[q("Local", "Life")]);
        let mut source = MockQuoteSource::new();
        source
            .expect_fetch_records()
            .returning(|| Err(SyncError::Network("connection refused".to_string())));

        let engine = engine_with(store.clone(), source);
        let mut rx = engine.subscribe();

        let result = engine.sync_once().await;
        assert_eq!(result, Err(SyncError::Network("connection refused".to_string())));
        assert_eq!(store.lock().quotes(), &[q("Local", "Life")]);

        assert_eq!(rx.recv().await.unwrap(), SyncStatus::Syncing);
        match rx.recv().await.unwrap() {
            SyncStatus::Failed(reason) => assert!(reason.contains("connection refused")),
            other => panic!("Expected Failed status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sync_reports_syncing_then_succeeded() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch_records().returning(|| Ok(Vec::new()));

        let engine = engine_with(shared_store(&[]), source);
        let mut rx = engine.subscribe();
        assert_eq!(engine.status(), None);

        engine.sync_once().await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), SyncStatus::Syncing);
        assert_eq!(rx.recv().await.unwrap(), SyncStatus::Succeeded);
    }

    struct GatedSource {
        gate: Arc<Notify>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteSource for GatedSource {
        async fn fetch_records(&self) -> Result<Vec<RemoteRecord>, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(records(&["late"]))
        }
    }

    #[tokio::test]
    async fn test_concurrent_trigger_is_rejected() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(GatedSource { gate: gate.clone(), calls: AtomicUsize::new(0) });
        let store = shared_store(&[]);
        let engine = SyncEngine::new(store.clone(), source.clone(), SyncConfig::default());

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.sync_once().await }
        });

        while !engine.is_syncing() {
            tokio::task::yield_now().await;
        }

        assert_eq!(engine.sync_once().await, Err(SyncError::InProgress));

        gate.notify_one();
        let report = first.await.unwrap().unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(!engine.is_syncing());
        assert_eq!(store.lock().quotes(), &[q("late", "Server")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_recurring_runs_each_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = MockQuoteSource::new();
        source.expect_fetch_records().returning({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            }
        });

        let engine = engine_with(shared_store(&[]), source);
        let handle = engine.schedule_recurring(Duration::from_secs(1));
        assert!(handle.is_running());

        // Nothing runs before the first interval elapses
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        handle.shutdown().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_schedule() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = MockQuoteSource::new();
        source.expect_fetch_records().returning({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            }
        });

        let engine = engine_with(shared_store(&[]), source);
        let handle = engine.schedule_recurring(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(handle);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = MockQuoteSource::new();
        source.expect_fetch_records().returning({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            }
        });

        let engine = engine_with(shared_store(&[]), source);
        let handle = engine.schedule_recurring(Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_running());
        assert!(calls.load(Ordering::SeqCst) >= 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_schedule_is_not_running() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch_records().returning(|| panic!("feed handler crashed"));

        let engine = engine_with(shared_store(&[]), source);
        let handle = engine.schedule_recurring(Duration::from_secs(1));
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!handle.is_running());

        handle.shutdown().await;
    }
}
