//! AdLayer - Ad slot coordination for host applications
//!
//! This library decides *when* an ad slot is allowed to load, *when* it is
//! allowed to present, and *how* transient load failures are retried. It does
//! not render anything itself: rendering, transport, persistence, and
//! analytics are injected collaborators.
//!
//! # High-Level API
//!
//! The [`manager`] module provides the facade most hosts use:
//!
//! ```ignore
//! use adlayer::manager::{AdManager, ShowCallbacks};
//! use adlayer::category::AdCategory;
//!
//! let manager = AdManager::new(provider, fetcher, persistence, events);
//! manager.register("ad_config", default_bytes);
//!
//! manager.load(AdCategory::Interstitial, "home_resume").await;
//! manager
//!     .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::default())
//!     .await?;
//! ```

pub mod arbiter;
pub mod category;
pub mod config;
pub mod error;
pub mod frequency;
pub mod logging;
pub mod manager;
pub mod persist;
pub mod provider;
pub mod slot;
pub mod telemetry;

/// Version of the AdLayer library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
