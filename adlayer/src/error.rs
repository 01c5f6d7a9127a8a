//! Caller-visible error taxonomy for presentation requests.

use crate::provider::{LoadError, PresentError};
use thiserror::Error;

/// Reasons a `show` request is rejected or a presentation fails.
///
/// The eligibility variants (`ConfigUnresolved` through `DisplayNotYet`) are
/// synchronous, non-retrying rejections returned directly from
/// [`crate::manager::AdManager::show`]. `LoadFailed` and `PresentFailed` are
/// asynchronous outcomes delivered through registered callbacks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShowError {
    /// No configuration snapshot has been resolved (or resolution failed
    /// terminally, or the user is premium at load time).
    #[error("configuration has not been resolved")]
    ConfigUnresolved,
    /// Ads are disabled globally, for this placement, or by premium status.
    #[error("placement is disabled")]
    PlacementDisabled,
    /// The placement is absent from the active snapshot, is not a
    /// slot-managed category, or was never loaded.
    #[error("placement is unknown or was never loaded")]
    PlacementUnknown,
    /// The slot holds no loaded ad.
    #[error("no ad is ready to present")]
    NotReady,
    /// The slot itself is already on screen.
    #[error("ad is already being displayed")]
    BeingDisplayed,
    /// A different slot currently holds the presentation token.
    #[error("another ad is currently showing")]
    OtherAdsShowing,
    /// The frequency gate suppressed this opportunity.
    #[error("frequency cap has not been reached yet")]
    DisplayNotYet,
    /// The load failed after the automatic retry was exhausted.
    #[error("ad failed to load: {0}")]
    LoadFailed(LoadError),
    /// The rendering collaborator reported a presentation failure.
    #[error("ad failed to present: {0}")]
    PresentFailed(PresentError),
}
