//! Tiered configuration resolution.
//!
//! The store publishes at most one active [`ConfigSnapshot`] at a time
//! through a watch channel. Resolution walks three tiers: the persisted
//! cache (published immediately while the fetch runs), the remote fetch
//! (retried exactly once after a delay; remote always wins over cache), and
//! the bundled default (taken at most once, only while nothing has been
//! published). Decode failures fall through to the next tier; exhausting
//! every tier leaves the store terminally unresolvable.

use super::fetch::ConfigFetcher;
use super::model::ConfigSnapshot;
use crate::persist::KeyValueStore;
use crate::telemetry::{AdEvent, EventSink};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Delay before the single remote fetch retry.
pub const DEFAULT_FETCH_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Persistence key marking that a resolution failure was already reported
/// once for this installation.
pub const FIRST_FAILURE_LOGGED_KEY: &str = "adlayer.config.first_failure_logged";

/// Tuning knobs for the resolution pipeline.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Delay between the first failed fetch and its single retry.
    pub fetch_retry_delay: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fetch_retry_delay: DEFAULT_FETCH_RETRY_DELAY,
        }
    }
}

impl StoreConfig {
    /// Sets the fetch retry delay.
    pub fn with_fetch_retry_delay(mut self, delay: Duration) -> Self {
        self.fetch_retry_delay = delay;
        self
    }
}

/// Where resolution currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionState {
    /// No snapshot yet; the pipeline may still produce one.
    Pending,
    /// A snapshot is active. Later tiers may still replace it.
    Ready(Arc<ConfigSnapshot>),
    /// Every tier was exhausted without a snapshot. Terminal.
    Unresolvable,
}

impl ResolutionState {
    /// True while no snapshot has been published and resolution continues.
    pub fn is_pending(&self) -> bool {
        matches!(self, ResolutionState::Pending)
    }

    /// The active snapshot, if one has been published.
    pub fn snapshot(&self) -> Option<Arc<ConfigSnapshot>> {
        match self {
            ResolutionState::Ready(snapshot) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }
}

enum FetchOutcome {
    Published,
    FetchFailed,
    DecodeFailed,
    Cancelled,
}

type ReadyHandler = Box<dyn FnOnce() + Send>;

struct StoreInner {
    remote_key: Option<String>,
    ready_handlers: Vec<ReadyHandler>,
    pipeline: Option<JoinHandle<()>>,
}

/// Resolves and owns the active configuration snapshot.
pub struct ConfigStore {
    persistence: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn ConfigFetcher>,
    events: Arc<dyn EventSink>,
    config: StoreConfig,
    state_tx: watch::Sender<ResolutionState>,
    inner: Mutex<StoreInner>,
    cancel: CancellationToken,
}

impl ConfigStore {
    /// Creates a store wired to its collaborators. Resolution does not start
    /// until [`ConfigStore::resolve`] is called.
    pub fn new(
        persistence: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn ConfigFetcher>,
        events: Arc<dyn EventSink>,
        config: StoreConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(ResolutionState::Pending);
        Self {
            persistence,
            fetcher,
            events,
            config,
            state_tx,
            inner: Mutex::new(StoreInner {
                remote_key: None,
                ready_handlers: Vec::new(),
                pipeline: None,
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// Starts resolution for `remote_key` with `default_bytes` as the last
    /// tier. The first call wins for the process lifetime; later calls are
    /// no-ops regardless of key.
    ///
    /// Must be called from within a tokio runtime.
    pub fn resolve(self: &Arc<Self>, remote_key: &str, default_bytes: Vec<u8>) {
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(existing) = &inner.remote_key {
                debug!(
                    remote_key,
                    existing = %existing,
                    "configuration already registered; ignoring"
                );
                return;
            }
            inner.remote_key = Some(remote_key.to_string());
        }

        info!(remote_key, "starting configuration resolution");
        self.load_cached(remote_key);

        let store = Arc::clone(self);
        let key = remote_key.to_string();
        let handle = tokio::spawn(async move { store.run_pipeline(key, default_bytes).await });
        self.inner.lock().unwrap().pipeline = Some(handle);
    }

    /// True once `resolve` has been called.
    pub fn is_started(&self) -> bool {
        self.inner.lock().unwrap().remote_key.is_some()
    }

    /// Current resolution state.
    pub fn state(&self) -> ResolutionState {
        self.state_tx.borrow().clone()
    }

    /// The active snapshot, if any tier has published one.
    pub fn active(&self) -> Option<Arc<ConfigSnapshot>> {
        self.state_tx.borrow().snapshot()
    }

    /// Subscribes to resolution state changes.
    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.state_tx.subscribe()
    }

    /// Runs `handler` once resolution settles (first snapshot published or
    /// terminally unresolvable). Runs immediately if already settled.
    pub fn on_ready(&self, handler: impl FnOnce() + Send + 'static) {
        if !self.state_tx.borrow().is_pending() {
            handler();
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        // Re-check under the lock so a concurrent publish cannot slip
        // between the check and the push.
        if !self.state_tx.borrow().is_pending() {
            drop(inner);
            handler();
            return;
        }
        inner.ready_handlers.push(Box::new(handler));
    }

    /// Cancels any in-flight fetch or retry timer and waits for the
    /// pipeline task to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.inner.lock().unwrap().pipeline.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        debug!("configuration store shut down");
    }

    fn load_cached(&self, key: &str) {
        let Some(bytes) = self.persistence.get(key) else {
            debug!(remote_key = key, "no cached configuration");
            return;
        };
        match ConfigSnapshot::decode(&bytes) {
            Ok(snapshot) => {
                info!(
                    remote_key = key,
                    placements = snapshot.placement_count(),
                    "using cached configuration while fetch runs"
                );
                self.publish(snapshot);
            }
            Err(err) => {
                warn!(remote_key = key, error = %err, "cached configuration failed to decode");
            }
        }
    }

    async fn run_pipeline(self: Arc<Self>, key: String, default_bytes: Vec<u8>) {
        if !self.await_connectivity().await {
            return;
        }

        match self.attempt_fetch(&key, 1).await {
            FetchOutcome::Published => return,
            FetchOutcome::Cancelled => return,
            FetchOutcome::DecodeFailed => {
                self.fall_back_to_default(&default_bytes);
                return;
            }
            FetchOutcome::FetchFailed => {}
        }

        tokio::select! {
            _ = self.cancel.cancelled() => return,
            _ = tokio::time::sleep(self.config.fetch_retry_delay) => {}
        }

        match self.attempt_fetch(&key, 2).await {
            FetchOutcome::Published | FetchOutcome::Cancelled => return,
            FetchOutcome::FetchFailed | FetchOutcome::DecodeFailed => {}
        }
        self.fall_back_to_default(&default_bytes);
    }

    /// Waits until the transport reports online. Returns false when shut
    /// down while still waiting.
    async fn await_connectivity(&self) -> bool {
        let mut rx = self.fetcher.connectivity();
        loop {
            if *rx.borrow_and_update() {
                return true;
            }
            info!("offline; deferring remote configuration fetch");
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                changed = rx.changed() => {
                    if changed.is_err() {
                        warn!("connectivity channel closed; proceeding with fetch");
                        return true;
                    }
                }
            }
        }
    }

    async fn attempt_fetch(&self, key: &str, attempt: u32) -> FetchOutcome {
        debug!(remote_key = key, attempt, "fetching remote configuration");
        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => return FetchOutcome::Cancelled,
            result = self.fetcher.fetch_remote(key) => result,
        };

        let bytes = match fetched {
            Ok(bytes) if bytes.is_empty() => {
                warn!(remote_key = key, attempt, "remote configuration payload is empty");
                self.note_fetch_failure(attempt);
                return FetchOutcome::FetchFailed;
            }
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    remote_key = key,
                    attempt,
                    error = %err,
                    "remote configuration fetch failed"
                );
                self.note_fetch_failure(attempt);
                return FetchOutcome::FetchFailed;
            }
        };

        match ConfigSnapshot::decode(&bytes) {
            Ok(snapshot) => {
                info!(
                    remote_key = key,
                    attempt,
                    placements = snapshot.placement_count(),
                    "remote configuration fetched"
                );
                self.publish(snapshot);
                FetchOutcome::Published
            }
            Err(err) => {
                warn!(
                    remote_key = key,
                    attempt,
                    error = %err,
                    "remote configuration failed to decode"
                );
                FetchOutcome::DecodeFailed
            }
        }
    }

    /// Reports the pipeline's first fetch failure to analytics, once per
    /// installation as a first-open event and as a launch event thereafter.
    fn note_fetch_failure(&self, attempt: u32) {
        if attempt != 1 {
            return;
        }
        if self.persistence.get_flag(FIRST_FAILURE_LOGGED_KEY) {
            self.events.emit(AdEvent::RemoteConfigLoadFailLaunchApp);
        } else {
            self.events.emit(AdEvent::RemoteConfigLoadFailFirstOpen);
            self.persistence.set_flag(FIRST_FAILURE_LOGGED_KEY, true);
        }
    }

    fn fall_back_to_default(&self, default_bytes: &[u8]) {
        if !self.state_tx.borrow().is_pending() {
            debug!("snapshot already active; skipping bundled default");
            return;
        }
        match ConfigSnapshot::decode(default_bytes) {
            Ok(snapshot) => {
                info!("falling back to bundled default configuration");
                self.publish(snapshot);
            }
            Err(err) => {
                error!(error = %err, "bundled default configuration failed to decode");
                self.mark_unresolvable();
            }
        }
    }

    fn publish(&self, snapshot: ConfigSnapshot) {
        match snapshot.encode() {
            Ok(bytes) => {
                let key = self.inner.lock().unwrap().remote_key.clone();
                if let Some(key) = key {
                    self.persistence.set(&key, bytes);
                }
            }
            Err(err) => warn!(error = %err, "failed to encode snapshot for caching"),
        }

        let snapshot = Arc::new(snapshot);
        info!(
            enabled = snapshot.enabled,
            placements = snapshot.placement_count(),
            "configuration snapshot published"
        );
        self.state_tx.send_replace(ResolutionState::Ready(snapshot));
        self.drain_ready_handlers();
    }

    fn mark_unresolvable(&self) {
        self.state_tx.send_replace(ResolutionState::Unresolvable);
        self.drain_ready_handlers();
    }

    fn drain_ready_handlers(&self) {
        let handlers: Vec<ReadyHandler> = {
            let mut inner = self.inner.lock().unwrap();
            inner.ready_handlers.drain(..).collect()
        };
        if !handlers.is_empty() {
            debug!(count = handlers.len(), "running queued ready handlers");
        }
        for handler in handlers {
            handler();
        }
    }
}
