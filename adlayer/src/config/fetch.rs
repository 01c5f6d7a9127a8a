//! Remote configuration transport collaborator.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::watch;

/// Errors from remote configuration fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchError {
    /// Human-readable error message.
    pub message: String,
}

impl FetchError {
    /// Creates a new fetch error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FetchError {}

/// Trait for the remote configuration transport.
///
/// Implementations wrap whatever remote-config backend the host uses. Besides
/// the fetch itself, the transport reports connectivity so the store can
/// defer fetching while known-offline.
pub trait ConfigFetcher: Send + Sync {
    /// Fetches the raw configuration payload stored under `remote_key`.
    ///
    /// # Returns
    ///
    /// The raw document bytes. An empty payload is treated by the store the
    /// same as a fetch failure.
    fn fetch_remote<'a>(
        &'a self,
        remote_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send + 'a>>;

    /// Subscribes to connectivity changes. `true` means online.
    ///
    /// The current value is observable immediately on the returned receiver.
    fn connectivity(&self) -> watch::Receiver<bool>;
}

/// Fetcher returning a fixed payload, always online.
///
/// Used by the demo harness and by tests that exercise the happy path.
pub struct StaticFetcher {
    payload: Vec<u8>,
    connectivity_tx: watch::Sender<bool>,
}

impl StaticFetcher {
    /// Creates a fetcher that always yields `payload`.
    pub fn new(payload: Vec<u8>) -> Self {
        let (connectivity_tx, _) = watch::channel(true);
        Self {
            payload,
            connectivity_tx,
        }
    }

    /// Overrides the reported connectivity, for offline-start scenarios.
    pub fn set_connected(&self, connected: bool) {
        // send_replace updates even while nobody subscribes yet.
        self.connectivity_tx.send_replace(connected);
    }
}

impl ConfigFetcher for StaticFetcher {
    fn fetch_remote<'a>(
        &'a self,
        _remote_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send + 'a>> {
        Box::pin(std::future::ready(Ok(self.payload.clone())))
    }

    fn connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher_returns_payload() {
        let fetcher = StaticFetcher::new(b"payload".to_vec());
        let bytes = fetcher.fetch_remote("any_key").await.unwrap();
        assert_eq!(bytes, b"payload");
    }

    #[tokio::test]
    async fn test_static_fetcher_reports_connectivity_changes() {
        let fetcher = StaticFetcher::new(Vec::new());
        let rx = fetcher.connectivity();
        assert!(*rx.borrow());

        fetcher.set_connected(false);
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::new("backend unreachable");
        assert_eq!(format!("{}", err), "backend unreachable");
    }
}
