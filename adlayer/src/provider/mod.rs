//! Ad network collaborator.
//!
//! The rendering SDK is injected behind [`AdProvider`]: one async `load` per
//! unit ID and one `present` that streams lifecycle events back. The library
//! never talks to a network SDK directly.

mod simulated;
mod types;

pub use simulated::{LoadScript, SimulatedProvider};
pub use types::{
    AdProvider, AdRevenue, LoadError, LoadedAd, PresentError, PresentEvent, Reward,
};
