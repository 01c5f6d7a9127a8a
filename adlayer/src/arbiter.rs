//! Cross-slot presentation arbitration.
//!
//! Exactly one ad may be on screen at any instant, across all slots of all
//! categories. The arbiter hands out at most one [`PresentationToken`] at a
//! time; the token is an RAII guard whose drop releases the arbiter. Acquire
//! is a single compare-and-swap, never a read-then-write, so two concurrent
//! `show` calls can never both observe "not presenting" and both proceed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Hands out the exclusive right to put an ad on screen.
///
/// # Example
///
/// ```
/// use adlayer::arbiter::PresentationArbiter;
///
/// let arbiter = PresentationArbiter::new();
/// let token = arbiter.try_acquire().expect("nothing presenting yet");
/// assert!(arbiter.try_acquire().is_none());
/// drop(token);
/// assert!(arbiter.try_acquire().is_some());
/// ```
#[derive(Debug, Default)]
pub struct PresentationArbiter {
    presenting: Arc<AtomicBool>,
}

impl PresentationArbiter {
    /// Creates an arbiter with no token outstanding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to acquire the presentation token.
    ///
    /// # Returns
    ///
    /// `Some(token)` if no slot is currently presenting, `None` otherwise.
    pub fn try_acquire(&self) -> Option<PresentationToken> {
        match self
            .presenting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                debug!("presentation token acquired");
                Some(PresentationToken {
                    presenting: Arc::clone(&self.presenting),
                })
            }
            Err(_) => {
                debug!("presentation token unavailable; another ad is on screen");
                None
            }
        }
    }

    /// True while a token is outstanding.
    pub fn is_presenting(&self) -> bool {
        self.presenting.load(Ordering::Acquire)
    }
}

/// Exclusive right for one slot to be on screen.
///
/// At most one token exists process-wide at any instant. Dropping the token
/// releases the arbiter; there is no explicit release call.
#[derive(Debug)]
pub struct PresentationToken {
    presenting: Arc<AtomicBool>,
}

impl Drop for PresentationToken {
    fn drop(&mut self) {
        self.presenting.store(false, Ordering::Release);
        debug!("presentation token released");
    }
}
