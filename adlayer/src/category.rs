//! Ad category taxonomy.
//!
//! Every placement belongs to exactly one category. The five full-screen
//! categories are slot-managed (loaded, retried, and presented through
//! [`crate::slot::AdSlot`]); `Native` and `Banner` are inline view categories
//! that only participate in configuration and status lookup.

use std::fmt;

/// Closed set of ad categories.
///
/// Dispatch across categories is keyed on this enum; there is no per-category
/// behavior type. Category-specific behavior (splash load timeout, frequency
/// capping for interstitial-like placements) is driven by the placement's
/// configuration fields instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdCategory {
    /// Full-screen ad shown while the host application starts up.
    Splash,
    /// Full-screen ad shown when the host application returns to foreground.
    AppOpen,
    /// Full-screen ad shown between host screens.
    Interstitial,
    /// Full-screen ad granting a reward when watched.
    Rewarded,
    /// Interstitial variant that can grant a reward.
    RewardedInterstitial,
    /// Inline ad rendered inside host layout (not slot-managed).
    Native,
    /// Inline banner strip (not slot-managed).
    Banner,
}

impl AdCategory {
    /// True for categories managed by a reusable load/present slot.
    pub fn is_presentable(&self) -> bool {
        !matches!(self, AdCategory::Native | AdCategory::Banner)
    }

    /// Stable name used in persistence keys and telemetry attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdCategory::Splash => "splash",
            AdCategory::AppOpen => "app_open",
            AdCategory::Interstitial => "interstitial",
            AdCategory::Rewarded => "rewarded",
            AdCategory::RewardedInterstitial => "rewarded_interstitial",
            AdCategory::Native => "native",
            AdCategory::Banner => "banner",
        }
    }
}

impl fmt::Display for AdCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
