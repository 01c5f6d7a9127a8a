//! Top-level façade wiring the coordination layer together.
//!
//! `AdManager` is an explicit context object constructed once at startup
//! from its collaborators and passed to call sites; there is no global
//! singleton. It owns the configuration store, the slot registry, the
//! presentation arbiter, and the frequency gate, and applies them in a fixed
//! order in front of every slot operation.

use crate::arbiter::PresentationArbiter;
use crate::category::AdCategory;
use crate::config::{ConfigFetcher, ConfigSnapshot, ConfigStore, PlacementConfig, StoreConfig};
use crate::error::ShowError;
use crate::frequency::FrequencyGate;
use crate::persist::KeyValueStore;
use crate::provider::AdProvider;
use crate::slot::{AdSlot, SlotConfig, SlotHooks, SlotRegistry};
use crate::telemetry::EventSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use crate::slot::ShowCallbacks;

/// Tuning knobs for the manager and its components.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Configuration-store pipeline knobs.
    pub store: StoreConfig,
    /// Delay between a slot's first load failure and its single retry.
    pub slot_retry_delay: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            slot_retry_delay: crate::slot::DEFAULT_LOAD_RETRY_DELAY,
        }
    }
}

impl ManagerConfig {
    /// Sets the store pipeline knobs.
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Sets the slot retry delay.
    pub fn with_slot_retry_delay(mut self, delay: Duration) -> Self {
        self.slot_retry_delay = delay;
        self
    }
}

/// Coordination-layer façade.
///
/// # Example
///
/// ```ignore
/// use adlayer::manager::{AdManager, ShowCallbacks};
/// use adlayer::category::AdCategory;
///
/// let manager = Arc::new(AdManager::new(provider, fetcher, persistence, events));
/// manager.register("ad_config", default_bytes);
/// manager.load(AdCategory::Interstitial, "home_resume").await;
/// manager
///     .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
///     .await?;
/// ```
pub struct AdManager {
    provider: Arc<dyn AdProvider>,
    events: Arc<dyn EventSink>,
    store: Arc<ConfigStore>,
    registry: SlotRegistry,
    arbiter: PresentationArbiter,
    gate: FrequencyGate,
    slot_hooks: SlotHooks,
    premium: AtomicBool,
    config: ManagerConfig,
}

impl AdManager {
    /// Creates a manager with default tuning.
    pub fn new(
        provider: Arc<dyn AdProvider>,
        fetcher: Arc<dyn ConfigFetcher>,
        persistence: Arc<dyn KeyValueStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_config(provider, fetcher, persistence, events, ManagerConfig::default())
    }

    /// Creates a manager with explicit tuning.
    pub fn with_config(
        provider: Arc<dyn AdProvider>,
        fetcher: Arc<dyn ConfigFetcher>,
        persistence: Arc<dyn KeyValueStore>,
        events: Arc<dyn EventSink>,
        config: ManagerConfig,
    ) -> Self {
        let store = Arc::new(ConfigStore::new(
            Arc::clone(&persistence),
            fetcher,
            Arc::clone(&events),
            config.store.clone(),
        ));
        Self {
            provider,
            events,
            store,
            registry: SlotRegistry::new(),
            arbiter: PresentationArbiter::new(),
            gate: FrequencyGate::new(persistence),
            slot_hooks: SlotHooks::default(),
            premium: AtomicBool::new(false),
            config,
        }
    }

    /// Installs lifecycle hooks applied to every slot created afterwards.
    pub fn with_slot_hooks(mut self, hooks: SlotHooks) -> Self {
        self.slot_hooks = hooks;
        self
    }

    /// The configuration store, for status subscriptions.
    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Starts configuration resolution for `remote_key` with `default_bytes`
    /// as the last tier. The first call wins for the process lifetime.
    ///
    /// Resolution runs even for premium users, so queued ready handlers
    /// drain and a later premium lapse finds a snapshot already active;
    /// premium gates display, not configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register(&self, remote_key: &str, default_bytes: Vec<u8>) {
        self.store.resolve(remote_key, default_bytes);
    }

    /// Marks the user premium. Premium disables all ad display but leaves
    /// any resolution already in flight untouched.
    pub fn set_premium(&self, premium: bool) {
        self.premium.store(premium, Ordering::Release);
        info!(premium, "premium status updated");
    }

    /// Current premium status.
    pub fn is_premium(&self) -> bool {
        self.premium.load(Ordering::Acquire)
    }

    /// Reports whether a placement may show.
    ///
    /// # Returns
    ///
    /// `None` while premium, unresolved, or for a placement the snapshot
    /// does not carry; `Some(false)` when globally or per-placement
    /// disabled; `Some(true)` otherwise.
    pub fn status(&self, category: AdCategory, name: &str) -> Option<bool> {
        if self.is_premium() {
            return None;
        }
        let snapshot = self.store.active()?;
        let placement = snapshot.placement(category, name)?;
        Some(snapshot.enabled && placement.enabled)
    }

    /// Starts (or re-triggers) loading for a placement.
    ///
    /// Awaits configuration resolution when still pending, so calls arriving
    /// before the first snapshot observe the eventually resolved one.
    /// Ineligible placements (premium, disabled, unknown, non-presentable
    /// category) are logged no-ops.
    pub async fn load(&self, category: AdCategory, name: &str) {
        if self.is_premium() {
            debug!(category = %category, name, "load skipped; premium user");
            return;
        }
        let Some(snapshot) = self.resolved_snapshot().await else {
            warn!(category = %category, name, "load skipped; configuration unresolved");
            return;
        };
        if !category.is_presentable() {
            debug!(category = %category, name, "load skipped; not a slot-managed category");
            return;
        }
        let Some(placement) = snapshot.placement(category, name) else {
            warn!(category = %category, name, "load skipped; placement unknown");
            return;
        };
        if !snapshot.enabled || !placement.enabled {
            debug!(category = %category, name, "load skipped; placement disabled");
            return;
        }

        let slot = self.slot_for(category, placement);
        slot.load();
    }

    /// Presents a loaded placement.
    ///
    /// Eligibility checks run in a fixed order, each with a distinct
    /// rejection: config status, slot existence, presentation arbiter,
    /// frequency gate. Asynchronous presentation outcomes arrive through
    /// `callbacks`.
    ///
    /// # Errors
    ///
    /// One of the synchronous [`ShowError`] eligibility variants.
    pub async fn show(
        &self,
        category: AdCategory,
        name: &str,
        callbacks: ShowCallbacks,
    ) -> Result<(), ShowError> {
        if self.is_premium() {
            debug!(category = %category, name, "show rejected; premium user");
            return Err(ShowError::PlacementDisabled);
        }
        let snapshot = self
            .resolved_snapshot()
            .await
            .ok_or(ShowError::ConfigUnresolved)?;
        let placement = snapshot
            .placement(category, name)
            .ok_or(ShowError::PlacementUnknown)?;
        if !snapshot.enabled || !placement.enabled {
            debug!(category = %category, name, "show rejected; placement disabled");
            return Err(ShowError::PlacementDisabled);
        }
        let slot = self
            .registry
            .get(category, &placement.unit_id)
            .ok_or(ShowError::PlacementUnknown)?;

        let Some(token) = self.arbiter.try_acquire() else {
            warn!(category = %category, name, "show rejected; another ad is on screen");
            return Err(ShowError::OtherAdsShowing);
        };

        if let (Some(start), Some(interval)) =
            (placement.frequency_start, placement.frequency_interval)
        {
            if !self
                .gate
                .should_show(&placement.name, start, interval, slot.holds_loaded_ad())
            {
                debug!(category = %category, name, "show rejected; frequency-suppressed");
                // Dropping the token here releases the arbiter.
                return Err(ShowError::DisplayNotYet);
            }
        }

        slot.show(token, callbacks)
    }

    /// Runs `handler` once the first snapshot is published (or resolution
    /// terminally fails). Runs immediately when already settled or premium.
    pub fn await_ready(&self, handler: impl FnOnce() + Send + 'static) {
        if self.is_premium() {
            handler();
            return;
        }
        self.store.on_ready(handler);
    }

    /// Tears down the store pipeline and every slot; pending retry and
    /// timeout timers are cancelled.
    pub async fn shutdown(&self) {
        self.store.shutdown().await;
        self.registry.shutdown_all();
        info!("ad manager shut down");
    }

    /// Looks up or lazily constructs the slot for a placement.
    fn slot_for(&self, category: AdCategory, placement: &PlacementConfig) -> Arc<AdSlot> {
        let mut slot_config = SlotConfig::default().with_retry_delay(self.config.slot_retry_delay);
        if category == AdCategory::Splash {
            if let Some(seconds) = placement.timeout_seconds {
                slot_config = slot_config.with_load_timeout(Duration::from_secs_f64(seconds));
            }
        }
        self.registry.get_or_create(category, &placement.unit_id, || {
            AdSlot::new(
                category,
                placement.name.clone(),
                placement.unit_id.clone(),
                Arc::clone(&self.provider),
                Arc::clone(&self.events),
                slot_config,
            )
            .with_hooks(self.slot_hooks.clone())
        })
    }

    /// Waits for resolution to settle and returns the active snapshot.
    ///
    /// Returns `None` when resolution was never started, terminally failed,
    /// or the store was shut down while waiting.
    async fn resolved_snapshot(&self) -> Option<Arc<ConfigSnapshot>> {
        if !self.store.is_started() {
            return None;
        }
        let mut rx = self.store.subscribe();
        let state = rx.wait_for(|state| !state.is_pending()).await.ok()?;
        state.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlacementConfig, StaticFetcher};
    use crate::persist::MemoryStore;
    use crate::provider::SimulatedProvider;
    use crate::telemetry::NoOpSink;

    fn demo_snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            enabled: true,
            interstitials: vec![
                PlacementConfig::new("home_resume", "unit-inter"),
                PlacementConfig::new("level_end", "unit-off").with_enabled(false),
            ],
            natives: vec![PlacementConfig::new("feed", "unit-native")],
            ..ConfigSnapshot::default()
        }
    }

    fn make_manager() -> AdManager {
        AdManager::new(
            Arc::new(SimulatedProvider::new()),
            Arc::new(StaticFetcher::new(demo_snapshot().encode().unwrap())),
            Arc::new(MemoryStore::new()),
            Arc::new(NoOpSink),
        )
    }

    #[tokio::test]
    async fn test_status_before_registration_is_none() {
        let manager = make_manager();
        assert_eq!(manager.status(AdCategory::Interstitial, "home_resume"), None);
    }

    #[tokio::test]
    async fn test_status_after_resolution() {
        let manager = make_manager();
        manager.register("ad_config", Vec::new());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            manager.status(AdCategory::Interstitial, "home_resume"),
            Some(true)
        );
        assert_eq!(
            manager.status(AdCategory::Interstitial, "level_end"),
            Some(false)
        );
        assert_eq!(manager.status(AdCategory::Interstitial, "missing"), None);
        assert_eq!(manager.status(AdCategory::Native, "feed"), Some(true));
    }

    #[tokio::test]
    async fn test_premium_blanks_status_and_blocks_show() {
        let manager = make_manager();
        manager.register("ad_config", Vec::new());
        tokio::time::sleep(Duration::from_millis(50)).await;

        manager.set_premium(true);
        assert_eq!(manager.status(AdCategory::Interstitial, "home_resume"), None);
        assert_eq!(
            manager
                .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
                .await,
            Err(ShowError::PlacementDisabled)
        );
    }

    #[tokio::test]
    async fn test_show_without_load_is_placement_unknown() {
        let manager = make_manager();
        manager.register("ad_config", Vec::new());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            manager
                .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
                .await,
            Err(ShowError::PlacementUnknown)
        );
    }

    #[tokio::test]
    async fn test_show_before_registration_is_config_unresolved() {
        let manager = make_manager();
        assert_eq!(
            manager
                .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
                .await,
            Err(ShowError::ConfigUnresolved)
        );
    }

    #[tokio::test]
    async fn test_load_queued_until_resolution_settles() {
        let fetcher = Arc::new(StaticFetcher::new(demo_snapshot().encode().unwrap()));
        fetcher.set_connected(false);
        let manager = Arc::new(AdManager::new(
            Arc::new(SimulatedProvider::new()),
            Arc::clone(&fetcher) as _,
            Arc::new(MemoryStore::new()),
            Arc::new(NoOpSink),
        ));
        manager.register("ad_config", Vec::new());

        // The pipeline is deferred while offline; the load must wait for the
        // eventually resolved snapshot instead of being dropped.
        let waiting = Arc::clone(&manager);
        let load_task = tokio::spawn(async move {
            waiting.load(AdCategory::Interstitial, "home_resume").await;
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!load_task.is_finished(), "load awaits the snapshot");
        assert!(manager.registry.is_empty());

        fetcher.set_connected(true);
        load_task.await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.registry.len(), 1);
    }

    #[tokio::test]
    async fn test_load_before_registration_is_a_no_op() {
        let manager = make_manager();
        manager.load(AdCategory::Interstitial, "home_resume").await;
        assert!(manager.registry.is_empty());
    }

    #[tokio::test]
    async fn test_load_for_disabled_placement_creates_no_slot() {
        let manager = make_manager();
        manager.register("ad_config", Vec::new());
        tokio::time::sleep(Duration::from_millis(50)).await;

        manager.load(AdCategory::Interstitial, "level_end").await;
        manager.load(AdCategory::Native, "feed").await;
        manager.load(AdCategory::Rewarded, "missing").await;
        assert!(manager.registry.is_empty());
    }

    #[tokio::test]
    async fn test_registration_resolves_even_while_premium() {
        let manager = make_manager();
        manager.set_premium(true);
        manager.register("ad_config", Vec::new());
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Display stays suppressed while premium.
        assert_eq!(manager.status(AdCategory::Interstitial, "home_resume"), None);

        // A premium lapse finds the resolved snapshot waiting.
        manager.set_premium(false);
        assert_eq!(
            manager.status(AdCategory::Interstitial, "home_resume"),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_ready_handler_queued_before_premium_still_drains() {
        let manager = make_manager();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        manager.await_ready(move || ran_clone.store(true, Ordering::SeqCst));

        manager.set_premium(true);
        manager.register("ad_config", Vec::new());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_await_ready_runs_immediately_for_premium() {
        let manager = make_manager();
        manager.set_premium(true);

        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        manager.await_ready(move || ran_clone.store(true, Ordering::SeqCst));
        assert!(ran.load(Ordering::SeqCst));
    }
}
