//! Durable key-value persistence collaborator.
//!
//! The host supplies something UserDefaults-shaped: synchronous byte-oriented
//! get/set keyed by strings. The library stores three kinds of values through
//! it: the cached configuration blob, per-placement frequency counters, and
//! the "first resolution failure already logged" marker.

use std::collections::HashMap;
use std::sync::RwLock;

/// Synchronous key-value persistence.
///
/// Implementations must be cheap to call from async context; anything doing
/// real I/O should buffer internally.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored bytes for `key`, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>);

    /// Reads a boolean marker. Absent keys read as `false`.
    fn get_flag(&self, key: &str) -> bool {
        matches!(self.get(key).as_deref(), Some([1]))
    }

    /// Writes a boolean marker.
    fn set_flag(&self, key: &str, value: bool) {
        self.set(key, vec![u8::from(value)]);
    }

    /// Reads a little-endian u32 counter. Absent or malformed keys read as 0.
    fn get_u32(&self, key: &str) -> u32 {
        self.get(key)
            .and_then(|bytes| bytes.try_into().ok())
            .map(u32::from_le_bytes)
            .unwrap_or(0)
    }

    /// Writes a little-endian u32 counter.
    fn set_u32(&self, key: &str, value: u32) {
        self.set(key, value.to_le_bytes().to_vec());
    }
}

/// In-memory store for tests and the demo harness.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// True when no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value);
        }
    }
}
