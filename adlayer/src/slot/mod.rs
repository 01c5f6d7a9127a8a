//! Per-unit ad slots.
//!
//! An [`AdSlot`] owns one ad unit's load/retry/present lifecycle; the
//! [`SlotRegistry`] memoizes one slot per (category, unit ID) pair for the
//! process lifetime.

mod machine;
mod registry;
mod state;

pub use machine::{AdSlot, ShowCallbacks, SlotConfig, SlotHooks, DEFAULT_LOAD_RETRY_DELAY};
pub use registry::SlotRegistry;
pub use state::SlotState;
