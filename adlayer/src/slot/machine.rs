//! Per-unit load/retry/present state machine.
//!
//! One `AdSlot` owns one ad unit's lifecycle: single-flight loading, a single
//! automatic retry after the first failure, presentation through the provider
//! with the arbiter token held for the duration, and an immediate reload once
//! the single-use ad is consumed.
//!
//! # Stale completions
//!
//! Every provider attempt is tagged with a load epoch. A completion whose
//! epoch no longer matches the slot's current epoch (the attempt timed out,
//! or the slot was torn down) is discarded instead of mutating state. The
//! retry timer and the splash load-timeout watchdog are tokio tasks guarded
//! by the slot's `CancellationToken`; teardown cancels them deterministically.

use super::state::SlotState;
use crate::arbiter::PresentationToken;
use crate::category::AdCategory;
use crate::error::ShowError;
use crate::provider::{AdProvider, LoadError, LoadedAd, PresentEvent, Reward};
use crate::telemetry::{AdEvent, EventSink};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delay before the single automatic load retry.
pub const DEFAULT_LOAD_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Tuning knobs for one slot.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    /// Delay between the first load failure and its single retry.
    pub retry_delay: Duration,
    /// Deadline for each load attempt (splash-style slots). `None` waits
    /// for the provider indefinitely.
    pub load_timeout: Option<Duration>,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_LOAD_RETRY_DELAY,
            load_timeout: None,
        }
    }
}

impl SlotConfig {
    /// Sets the retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the per-attempt load deadline.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }
}

/// Caller callbacks for one presentation.
///
/// `on_fail` and `on_hide` are terminal and fire at most once; `on_reward`
/// may fire any number of times before the terminal event.
#[derive(Default)]
pub struct ShowCallbacks {
    /// Asynchronous presentation failure.
    pub on_fail: Option<Box<dyn FnOnce(ShowError) + Send>>,
    /// Reward earned (rewarded categories).
    pub on_reward: Option<Box<dyn Fn(Reward) + Send>>,
    /// The ad was dismissed.
    pub on_hide: Option<Box<dyn FnOnce() + Send>>,
}

impl ShowCallbacks {
    /// Creates empty callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the presentation-failure callback.
    pub fn with_on_fail(mut self, f: impl FnOnce(ShowError) + Send + 'static) -> Self {
        self.on_fail = Some(Box::new(f));
        self
    }

    /// Sets the reward callback.
    pub fn with_on_reward(mut self, f: impl Fn(Reward) + Send + 'static) -> Self {
        self.on_reward = Some(Box::new(f));
        self
    }

    /// Sets the dismissal callback.
    pub fn with_on_hide(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_hide = Some(Box::new(f));
        self
    }
}

/// Lifecycle hooks observed by the slot's owner.
#[derive(Clone, Default)]
pub struct SlotHooks {
    /// A load cycle succeeded. Receives the unit ID.
    pub on_loaded: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    /// A load cycle failed after exhausting the automatic retry. Receives
    /// the unit ID and [`ShowError::LoadFailed`] carrying the last error.
    pub on_load_failed: Option<Arc<dyn Fn(&str, ShowError) + Send + Sync>>,
}

/// What `note_failure` decided under the lock.
enum FailureAction {
    Retrying,
    GiveUp(LoadError),
}

struct SlotInner {
    state: SlotState,
    retry_attempt: u32,
    /// Tag of the currently valid load attempt; completions carrying any
    /// other value are stale.
    epoch: u64,
    held: Option<LoadedAd>,
}

/// Per-unit load/retry/present state machine.
///
/// All state mutations funnel through one mutex; provider completions
/// re-enter through the same mutex and are validated against the load epoch.
pub struct AdSlot {
    category: AdCategory,
    placement: String,
    unit_id: String,
    config: SlotConfig,
    provider: Arc<dyn AdProvider>,
    events: Arc<dyn EventSink>,
    hooks: SlotHooks,
    inner: Mutex<SlotInner>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for AdSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdSlot")
            .field("category", &self.category)
            .field("placement", &self.placement)
            .field("unit_id", &self.unit_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AdSlot {
    /// Creates an idle slot for one ad unit.
    pub fn new(
        category: AdCategory,
        placement: impl Into<String>,
        unit_id: impl Into<String>,
        provider: Arc<dyn AdProvider>,
        events: Arc<dyn EventSink>,
        config: SlotConfig,
    ) -> Self {
        Self {
            category,
            placement: placement.into(),
            unit_id: unit_id.into(),
            config,
            provider,
            events,
            hooks: SlotHooks::default(),
            inner: Mutex::new(SlotInner {
                state: SlotState::Idle,
                retry_attempt: 0,
                epoch: 0,
                held: None,
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// Installs lifecycle hooks. Replaces any previous hooks.
    pub fn with_hooks(mut self, hooks: SlotHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Category this slot presents for.
    pub fn category(&self) -> AdCategory {
        self.category
    }

    /// Logical placement name.
    pub fn placement(&self) -> &str {
        &self.placement
    }

    /// Network unit ID. Immutable after construction.
    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SlotState {
        self.inner.lock().unwrap().state
    }

    /// Consecutive load failures since the last success.
    pub fn retry_attempt(&self) -> u32 {
        self.inner.lock().unwrap().retry_attempt
    }

    /// True while a loaded, not-yet-shown ad is held.
    pub fn holds_loaded_ad(&self) -> bool {
        self.inner.lock().unwrap().held.is_some()
    }

    /// Starts a load cycle. Single-flight: a no-op unless the slot is idle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load(self: &Arc<Self>) {
        let epoch = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != SlotState::Idle {
                debug!(
                    unit_id = %self.unit_id,
                    state = %inner.state,
                    "load ignored; slot is busy or already holds an ad"
                );
                return;
            }
            inner.state = SlotState::Loading;
            inner.epoch += 1;
            inner.epoch
        };
        debug!(unit_id = %self.unit_id, category = %self.category, epoch, "starting load");
        self.begin_attempt(epoch);
    }

    /// True iff the slot holds a loaded ad.
    ///
    /// Self-healing: when the slot sits idle with the automatic retry already
    /// exhausted, a readiness check triggers a fresh load before returning.
    pub fn is_ready(self: &Arc<Self>) -> bool {
        let (ready, heal_epoch) = {
            let mut inner = self.inner.lock().unwrap();
            let ready = inner.state == SlotState::Ready;
            let heal = if inner.state == SlotState::Idle && inner.retry_attempt >= 2 {
                inner.state = SlotState::Loading;
                inner.epoch += 1;
                Some(inner.epoch)
            } else {
                None
            };
            (ready, heal)
        };
        if let Some(epoch) = heal_epoch {
            debug!(unit_id = %self.unit_id, "readiness check triggering reload");
            self.begin_attempt(epoch);
        }
        ready
    }

    /// Presents the held ad, consuming it and the arbiter token.
    ///
    /// The token travels with the presentation and is dropped (releasing the
    /// arbiter) when the ad leaves the screen. On dismissal or presentation
    /// failure the slot immediately starts warming the next ad.
    ///
    /// # Errors
    ///
    /// `BeingDisplayed` while this slot is on screen, `NotReady` when no
    /// loaded ad is held.
    pub fn show(
        self: &Arc<Self>,
        token: PresentationToken,
        callbacks: ShowCallbacks,
    ) -> Result<(), ShowError> {
        let ad = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == SlotState::Presenting {
                return Err(ShowError::BeingDisplayed);
            }
            if inner.state != SlotState::Ready {
                return Err(ShowError::NotReady);
            }
            // The ad is consumed at delegation; `Presenting` is entered on
            // the provider's will-present signal.
            inner.held.take().ok_or(ShowError::NotReady)?
        };

        info!(unit_id = %self.unit_id, category = %self.category, "presenting ad");
        let mut events = self.provider.present(ad);
        let slot = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = slot.cancel.cancelled() => return,
                    event = events.recv() => event,
                };
                let Some(event) = event else {
                    // Channel closed without a terminal event; treat as hidden.
                    slot.finish_presentation(token, None, callbacks);
                    return;
                };
                match event {
                    PresentEvent::WillPresent => {
                        slot.inner.lock().unwrap().state = SlotState::Presenting;
                        info!(unit_id = %slot.unit_id, "ad on screen");
                    }
                    PresentEvent::Paid(revenue) => {
                        slot.events.emit(AdEvent::AdRevenue {
                            unit_id: slot.unit_id.clone(),
                            format: slot.category,
                            value_micros: revenue.value_micros,
                            currency: revenue.currency,
                        });
                    }
                    PresentEvent::Reward(reward) => {
                        debug!(unit_id = %slot.unit_id, amount = reward.amount, "reward earned");
                        if let Some(on_reward) = &callbacks.on_reward {
                            on_reward(reward);
                        }
                    }
                    PresentEvent::DidHide => {
                        slot.finish_presentation(token, None, callbacks);
                        return;
                    }
                    PresentEvent::FailedToPresent(err) => {
                        slot.finish_presentation(token, Some(err), callbacks);
                        return;
                    }
                }
            }
        });
        Ok(())
    }

    /// Cancels pending timers and in-flight attempts and goes idle.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let mut inner = self.inner.lock().unwrap();
        inner.state = SlotState::Idle;
        inner.held = None;
        debug!(unit_id = %self.unit_id, "slot shut down");
    }

    fn begin_attempt(self: &Arc<Self>, epoch: u64) {
        let slot = Arc::clone(self);
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = slot.cancel.cancelled() => return,
                result = slot.provider.load(&slot.unit_id) => result,
            };
            slot.complete_load(epoch, result);
        });

        if let Some(timeout) = self.config.load_timeout {
            let slot = Arc::clone(self);
            tokio::spawn(async move {
                tokio::select! {
                    _ = slot.cancel.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => slot.expire_load(epoch, timeout),
                }
            });
        }
    }

    fn complete_load(self: &Arc<Self>, epoch: u64, result: Result<LoadedAd, LoadError>) {
        let outcome = {
            let mut inner = self.inner.lock().unwrap();
            if inner.epoch != epoch || inner.state != SlotState::Loading {
                debug!(
                    unit_id = %self.unit_id,
                    epoch,
                    current = inner.epoch,
                    "stale load completion discarded"
                );
                return;
            }
            match result {
                Ok(ad) => {
                    inner.state = SlotState::Ready;
                    inner.retry_attempt = 0;
                    inner.held = Some(ad);
                    info!(unit_id = %self.unit_id, category = %self.category, "ad loaded");
                    None
                }
                Err(err) => Some(self.note_failure(&mut inner, err)),
            }
        };
        // Hooks fire outside the lock.
        match outcome {
            None => {
                if let Some(on_loaded) = &self.hooks.on_loaded {
                    on_loaded(&self.unit_id);
                }
            }
            Some(FailureAction::GiveUp(err)) => {
                if let Some(on_load_failed) = &self.hooks.on_load_failed {
                    on_load_failed(&self.unit_id, ShowError::LoadFailed(err));
                }
            }
            Some(FailureAction::Retrying) => {}
        }
    }

    /// Synthesizes a failure for an attempt that outran its deadline. The
    /// still-running provider call becomes stale through the epoch bump.
    fn expire_load(self: &Arc<Self>, epoch: u64, timeout: Duration) {
        let outcome = {
            let mut inner = self.inner.lock().unwrap();
            if inner.epoch != epoch || inner.state != SlotState::Loading {
                return;
            }
            inner.epoch += 1;
            warn!(
                unit_id = %self.unit_id,
                timeout_secs = timeout.as_secs_f64(),
                "load timed out; synthesizing failure"
            );
            self.note_failure(&mut inner, LoadError::timed_out(timeout.as_secs_f64()))
        };
        if let FailureAction::GiveUp(err) = outcome {
            if let Some(on_load_failed) = &self.hooks.on_load_failed {
                on_load_failed(&self.unit_id, ShowError::LoadFailed(err));
            }
        }
    }

    /// Records a load failure. First failure of the cycle schedules one
    /// retry and stays `Loading`; any later failure goes idle. Caller holds
    /// the lock.
    fn note_failure(self: &Arc<Self>, inner: &mut SlotInner, err: LoadError) -> FailureAction {
        inner.retry_attempt += 1;
        if inner.retry_attempt == 1 {
            // This attempt is settled: bump the epoch so its still-pending
            // timeout watchdog (or a duplicate completion) cannot count a
            // second failure during the retry window.
            inner.epoch += 1;
            warn!(
                unit_id = %self.unit_id,
                error = %err,
                delay_secs = self.config.retry_delay.as_secs_f64(),
                "load failed; retrying once"
            );
            let expected = inner.epoch;
            let delay = self.config.retry_delay;
            let slot = Arc::clone(self);
            tokio::spawn(async move {
                tokio::select! {
                    _ = slot.cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => slot.retry(expected),
                }
            });
            FailureAction::Retrying
        } else {
            inner.state = SlotState::Idle;
            warn!(
                unit_id = %self.unit_id,
                attempts = inner.retry_attempt,
                error = %err,
                "load failed after retry; going idle"
            );
            FailureAction::GiveUp(err)
        }
    }

    fn retry(self: &Arc<Self>, expected_epoch: u64) {
        let epoch = {
            let mut inner = self.inner.lock().unwrap();
            if inner.epoch != expected_epoch || inner.state != SlotState::Loading {
                debug!(unit_id = %self.unit_id, "retry abandoned; slot moved on");
                return;
            }
            inner.epoch += 1;
            inner.epoch
        };
        debug!(unit_id = %self.unit_id, epoch, "retrying load");
        self.begin_attempt(epoch);
    }

    fn finish_presentation(
        self: &Arc<Self>,
        token: PresentationToken,
        failure: Option<crate::provider::PresentError>,
        callbacks: ShowCallbacks,
    ) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = SlotState::Idle;
            inner.held = None;
        }
        // Release the arbiter before any callback can start another show.
        drop(token);

        match failure {
            Some(err) => {
                warn!(unit_id = %self.unit_id, error = %err, "presentation failed");
                if let Some(on_fail) = callbacks.on_fail {
                    on_fail(ShowError::PresentFailed(err));
                }
            }
            None => {
                info!(unit_id = %self.unit_id, "ad dismissed");
                if let Some(on_hide) = callbacks.on_hide {
                    on_hide();
                }
            }
        }

        // Ads are single-use; start warming the next one right away.
        self.load();
    }
}
