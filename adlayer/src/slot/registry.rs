//! Lazy, memoized slot storage.

use super::machine::AdSlot;
use crate::category::AdCategory;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// One slot per (category, unit ID) pair for the process lifetime.
///
/// Construction is idempotent: concurrent lookups for the same key race on
/// the map entry, and exactly one constructed slot wins.
#[derive(Default)]
pub struct SlotRegistry {
    slots: DashMap<(AdCategory, String), Arc<AdSlot>>,
}

impl SlotRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the slot for `(category, unit_id)` without creating it.
    pub fn get(&self, category: AdCategory, unit_id: &str) -> Option<Arc<AdSlot>> {
        self.slots
            .get(&(category, unit_id.to_string()))
            .map(|entry| Arc::clone(&entry))
    }

    /// Returns the existing slot for the key, or builds and stores one.
    pub fn get_or_create(
        &self,
        category: AdCategory,
        unit_id: &str,
        build: impl FnOnce() -> AdSlot,
    ) -> Arc<AdSlot> {
        let entry = self
            .slots
            .entry((category, unit_id.to_string()))
            .or_insert_with(|| {
                debug!(category = %category, unit_id, "creating slot");
                Arc::new(build())
            });
        Arc::clone(&entry)
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no slot has been created yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Shuts down every slot, cancelling pending timers.
    pub fn shutdown_all(&self) {
        for entry in self.slots.iter() {
            entry.value().shutdown();
        }
    }
}
