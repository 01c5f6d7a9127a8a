//! Slot lifecycle states.

use std::fmt;

/// Lifecycle state of an [`crate::slot::AdSlot`].
///
/// ```text
/// Idle --load()--> Loading --success--> Ready --show()--> Presenting
///   ^                 |                                      |
///   |   second consecutive failure                 did hide / present failed
///   +-----------------+--------------------------------------+
/// ```
///
/// A first load failure schedules one retry and stays in `Loading`; leaving
/// `Presenting` re-enters `Loading` immediately to warm the next ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No ad held, nothing in flight.
    Idle,
    /// A load (or its single automatic retry) is in flight.
    Loading,
    /// A loaded ad is held, waiting to present.
    Ready,
    /// The held ad is on screen.
    Presenting,
}

impl SlotState {
    /// Stable lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotState::Idle => "idle",
            SlotState::Loading => "loading",
            SlotState::Ready => "ready",
            SlotState::Presenting => "presenting",
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
