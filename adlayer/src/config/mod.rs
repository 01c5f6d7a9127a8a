//! Configuration document and its resolution pipeline.
//!
//! ```text
//! ┌──────────────┐   cache bytes    ┌───────────────┐
//! │ KeyValueStore├─────────────────▶│               │
//! └──────────────┘                  │  ConfigStore  │──▶ ConfigSnapshot
//! ┌──────────────┐  remote bytes    │  (tiered      │    (watch channel,
//! │ ConfigFetcher├─────────────────▶│   resolution) │     ready handlers)
//! └──────────────┘                  │               │
//!    bundled default bytes ────────▶└───────────────┘
//! ```
//!
//! Resolution order: cached snapshot (fast path) → remote fetch with one
//! delayed retry → bundled default, taken at most once and only while no
//! snapshot has been published.

mod fetch;
mod model;
mod store;

pub use fetch::{ConfigFetcher, FetchError, StaticFetcher};
pub use model::{ConfigDecodeError, ConfigSnapshot, PlacementConfig};
pub use store::{
    ConfigStore, ResolutionState, StoreConfig, DEFAULT_FETCH_RETRY_DELAY,
    FIRST_FAILURE_LOGGED_KEY,
};
