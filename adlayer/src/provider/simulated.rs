//! Scriptable in-process provider.
//!
//! Stands in for a real rendering SDK in tests and in the demo harness.
//! Load outcomes follow a script queue (defaulting to success); presentation
//! runs a fixed will-present / hold / dismiss sequence.

use super::types::{
    AdProvider, AdRevenue, LoadError, LoadedAd, PresentError, PresentEvent, Reward,
    PRESENT_EVENT_CAPACITY,
};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// One scripted load outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadScript {
    /// Complete successfully after the configured latency.
    Succeed,
    /// Fail with a retryable error after the configured latency.
    Fail,
    /// Sleep for the given duration, then succeed. Used to drive load
    /// timeouts: the slot's deadline fires while the load is still stalled.
    Stall(Duration),
}

/// Provider double with scriptable outcomes.
pub struct SimulatedProvider {
    load_latency: Duration,
    present_hold: Duration,
    reward: Option<Reward>,
    revenue: Option<AdRevenue>,
    present_failure: Option<PresentError>,
    script: Mutex<VecDeque<LoadScript>>,
    load_calls: AtomicU64,
    handle_seq: AtomicU64,
}

impl SimulatedProvider {
    /// Creates a provider that loads instantly and presents for 10ms.
    pub fn new() -> Self {
        Self {
            load_latency: Duration::ZERO,
            present_hold: Duration::from_millis(10),
            reward: None,
            revenue: None,
            present_failure: None,
            script: Mutex::new(VecDeque::new()),
            load_calls: AtomicU64::new(0),
            handle_seq: AtomicU64::new(0),
        }
    }

    /// Sets the latency applied to scripted `Succeed`/`Fail` outcomes.
    pub fn with_load_latency(mut self, latency: Duration) -> Self {
        self.load_latency = latency;
        self
    }

    /// Sets how long a presentation stays on screen before dismissing.
    pub fn with_present_hold(mut self, hold: Duration) -> Self {
        self.present_hold = hold;
        self
    }

    /// Emits a reward event before every dismissal.
    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.reward = Some(reward);
        self
    }

    /// Emits a paid event after every will-present.
    pub fn with_revenue(mut self, revenue: AdRevenue) -> Self {
        self.revenue = Some(revenue);
        self
    }

    /// Makes every presentation fail instead of showing.
    pub fn with_present_failure(mut self, error: PresentError) -> Self {
        self.present_failure = Some(error);
        self
    }

    /// Appends outcomes to the load script. An exhausted script succeeds.
    pub fn push_script(&self, outcomes: impl IntoIterator<Item = LoadScript>) {
        if let Ok(mut script) = self.script.lock() {
            script.extend(outcomes);
        }
    }

    /// Total number of `load` calls observed.
    pub fn load_calls(&self) -> u64 {
        self.load_calls.load(Ordering::Relaxed)
    }

    fn next_outcome(&self) -> LoadScript {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or(LoadScript::Succeed)
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AdProvider for SimulatedProvider {
    fn load<'a>(
        &'a self,
        unit_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<LoadedAd, LoadError>> + Send + 'a>> {
        let call = self.load_calls.fetch_add(1, Ordering::Relaxed) + 1;
        let outcome = self.next_outcome();
        Box::pin(async move {
            debug!(unit_id, call, outcome = ?outcome, "simulated load");
            match outcome {
                LoadScript::Succeed => {
                    tokio::time::sleep(self.load_latency).await;
                    Ok(LoadedAd {
                        unit_id: unit_id.to_string(),
                        handle: self.handle_seq.fetch_add(1, Ordering::Relaxed),
                    })
                }
                LoadScript::Fail => {
                    tokio::time::sleep(self.load_latency).await;
                    Err(LoadError::retryable("simulated load failure"))
                }
                LoadScript::Stall(duration) => {
                    tokio::time::sleep(duration).await;
                    Ok(LoadedAd {
                        unit_id: unit_id.to_string(),
                        handle: self.handle_seq.fetch_add(1, Ordering::Relaxed),
                    })
                }
            }
        })
    }

    fn present(&self, ad: LoadedAd) -> mpsc::Receiver<PresentEvent> {
        let (tx, rx) = mpsc::channel(PRESENT_EVENT_CAPACITY);
        let hold = self.present_hold;
        let reward = self.reward.clone();
        let revenue = self.revenue.clone();
        let failure = self.present_failure.clone();
        tokio::spawn(async move {
            debug!(unit_id = %ad.unit_id, handle = ad.handle, "simulated present");
            if let Some(error) = failure {
                let _ = tx.send(PresentEvent::FailedToPresent(error)).await;
                return;
            }
            let _ = tx.send(PresentEvent::WillPresent).await;
            if let Some(revenue) = revenue {
                let _ = tx.send(PresentEvent::Paid(revenue)).await;
            }
            tokio::time::sleep(hold).await;
            if let Some(reward) = reward {
                let _ = tx.send(PresentEvent::Reward(reward)).await;
            }
            let _ = tx.send(PresentEvent::DidHide).await;
        });
        rx
    }
}
