//! Frequency capping for presentation attempts.
//!
//! Each placement name carries a persisted opportunity counter. With a
//! configured `start` and `interval`, the gate suppresses the first `start`
//! opportunities and then allows exactly one in every `interval` thereafter.
//!
//! The counter increment is deliberately folded into the boolean-returning
//! check: an eligible opportunity leaves the counter untouched unless the
//! slot already holds a loaded, not-yet-shown ad. The decision point is
//! consumed only when a presentation attempt will follow a fresh load, which
//! keeps the counter from drifting while a pre-loaded slot shows repeatedly.

use crate::persist::KeyValueStore;
use std::sync::Arc;
use tracing::debug;

/// Key prefix for per-placement opportunity counters.
pub const FREQUENCY_KEY_PREFIX: &str = "adlayer.frequency.";

/// Decides show/no-show under a start+interval rule with persisted counters.
pub struct FrequencyGate {
    persistence: Arc<dyn KeyValueStore>,
}

impl FrequencyGate {
    /// Creates a gate backed by the given persistence collaborator.
    pub fn new(persistence: Arc<dyn KeyValueStore>) -> Self {
        Self { persistence }
    }

    /// Current persisted opportunity count for `name`.
    pub fn count(&self, name: &str) -> u32 {
        self.persistence.get_u32(&Self::key(name))
    }

    /// Reports whether this presentation opportunity is eligible.
    ///
    /// `already_loaded` is whether the slot currently holds a loaded,
    /// not-yet-shown ad. An `interval` of zero disables the gate entirely:
    /// always eligible, counter untouched.
    pub fn should_show(&self, name: &str, start: u32, interval: u32, already_loaded: bool) -> bool {
        if interval == 0 {
            return true;
        }
        let key = Self::key(name);
        let count = self.persistence.get_u32(&key) + 1;
        if count < start {
            self.persistence.set_u32(&key, count);
            debug!(name, count, start, "frequency gate: below start threshold");
            return false;
        }

        let eligible = (count - start) % interval == 0;
        if !eligible || already_loaded {
            self.persistence.set_u32(&key, count);
        }
        debug!(
            name,
            count, start, interval, already_loaded, eligible, "frequency gate decision"
        );
        eligible
    }

    fn key(name: &str) -> String {
        format!("{FREQUENCY_KEY_PREFIX}{name}")
    }
}
