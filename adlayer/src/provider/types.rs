//! Contract between the coordination layer and the rendering SDK.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// Channel capacity for presentation event streams.
///
/// A presentation emits at most a handful of events (will-present, optional
/// paid/reward, one terminal), so a small buffer never backpressures.
pub const PRESENT_EVENT_CAPACITY: usize = 8;

/// Handle to one loaded, not-yet-shown creative.
///
/// Single-use: presenting consumes the handle. The `handle` value is
/// provider-internal and only meaningful to the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAd {
    /// Unit the creative was loaded for.
    pub unit_id: String,
    /// Provider-internal creative identifier.
    pub handle: u64,
}

/// Errors from ad loads.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadError {
    /// Human-readable error message.
    pub message: String,
    /// Whether this error is transient (network hiccup) or permanent.
    pub is_retryable: bool,
}

impl LoadError {
    /// Creates a retryable error (transient failure like a network timeout).
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retryable: true,
        }
    }

    /// Creates a permanent error (won't succeed on retry).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retryable: false,
        }
    }

    /// Creates the synthesized error for a load that exceeded its deadline.
    pub fn timed_out(seconds: f64) -> Self {
        Self {
            message: format!("load timed out after {seconds}s"),
            is_retryable: true,
        }
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LoadError {}

/// Errors from ad presentation, reported by the rendering SDK.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentError {
    /// Human-readable error message.
    pub message: String,
}

impl PresentError {
    /// Creates a new presentation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PresentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PresentError {}

/// Reward granted by a rewarded creative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reward {
    /// Reward amount in reward units.
    pub amount: i64,
    /// Reward unit name (coins, lives, ...).
    pub kind: String,
}

/// Revenue reported for a presented creative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdRevenue {
    /// Revenue in micro-units of `currency`.
    pub value_micros: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Lifecycle events streamed during one presentation.
///
/// `DidHide` and `FailedToPresent` are terminal; the provider closes the
/// channel after sending one of them.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentEvent {
    /// The creative is about to cover the screen.
    WillPresent,
    /// The network reported revenue for this impression.
    Paid(AdRevenue),
    /// The user earned a reward (rewarded categories only).
    Reward(Reward),
    /// The creative was dismissed.
    DidHide,
    /// The creative could not be shown.
    FailedToPresent(PresentError),
}

/// Trait for the rendering SDK.
///
/// # Example
///
/// ```ignore
/// use adlayer::provider::AdProvider;
///
/// async fn warm(provider: &dyn AdProvider) {
///     match provider.load("ca-app-pub-unit").await {
///         Ok(ad) => println!("loaded creative {}", ad.handle),
///         Err(e) => println!("load failed: {}", e),
///     }
/// }
/// ```
pub trait AdProvider: Send + Sync {
    /// Requests one creative for `unit_id`.
    ///
    /// # Returns
    ///
    /// A single-use [`LoadedAd`] handle on success.
    fn load<'a>(
        &'a self,
        unit_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<LoadedAd, LoadError>> + Send + 'a>>;

    /// Presents a loaded creative, consuming its handle.
    ///
    /// # Returns
    ///
    /// A receiver of [`PresentEvent`]s. The provider sends `WillPresent`
    /// first, then zero or more `Paid`/`Reward` events, then exactly one
    /// terminal event before closing the channel.
    fn present(&self, ad: LoadedAd) -> mpsc::Receiver<PresentEvent>;
}
