//! Decoded configuration document.

use crate::category::AdCategory;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors decoding or encoding a configuration document.
#[derive(Debug, Error)]
pub enum ConfigDecodeError {
    /// The payload contained no bytes at all.
    #[error("configuration payload is empty")]
    Empty,
    /// The payload was not a valid configuration document.
    #[error("invalid configuration document: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// One configured placement.
///
/// Immutable once decoded; a new snapshot replaces the whole set atomically.
/// Only `name`, `unitID`, and `enabled` are required; the optional fields are
/// category-specific (`timeoutSeconds` for splash, `frequencyStart` and
/// `frequencyInterval` for interstitial-like placements, the layout hints for
/// native placements).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConfig {
    /// Logical placement name callers use in `load`/`show`/`status`.
    pub name: String,
    /// Network-side unit identifier the provider loads against.
    #[serde(rename = "unitID")]
    pub unit_id: String,
    /// Whether this placement may load and present.
    pub enabled: bool,
    /// Native placements: load automatically when the view appears.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto: Option<bool>,
    /// Native placements: render edge to edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_full_screen: Option<bool>,
    /// Native placements: request the creative before the view appears.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_preload: Option<bool>,
    /// Free-form operator note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Splash placements: maximum seconds to wait for the load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<f64>,
    /// Frequency capping: opportunities suppressed before the first show.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_start: Option<u32>,
    /// Frequency capping: show once per this many opportunities after start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_interval: Option<u32>,
}

impl PlacementConfig {
    /// Creates a minimal enabled placement. Optional fields start unset.
    pub fn new(name: impl Into<String>, unit_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit_id: unit_id.into(),
            enabled: true,
            is_auto: None,
            is_full_screen: None,
            is_preload: None,
            description: None,
            timeout_seconds: None,
            frequency_start: None,
            frequency_interval: None,
        }
    }

    /// Sets the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the splash load timeout in seconds.
    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Sets both frequency capping parameters.
    pub fn with_frequency(mut self, start: u32, interval: u32) -> Self {
        self.frequency_start = Some(start);
        self.frequency_interval = Some(interval);
        self
    }
}

/// The full decoded configuration document.
///
/// Exactly one snapshot is active at a time; replacement is atomic from the
/// reader's perspective. Singleton categories hold at most one placement,
/// list categories hold an ordered collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    /// Global kill switch: when false nothing loads or presents.
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splash: Option<PlacementConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_open: Option<PlacementConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interstitials: Vec<PlacementConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rewardeds: Vec<PlacementConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rewarded_interstitials: Vec<PlacementConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub natives: Vec<PlacementConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub banners: Vec<PlacementConfig>,
}

impl ConfigSnapshot {
    /// Decodes a configuration document from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigDecodeError::Empty`] for a zero-length payload and
    /// [`ConfigDecodeError::Invalid`] for malformed JSON.
    pub fn decode(bytes: &[u8]) -> Result<Self, ConfigDecodeError> {
        if bytes.is_empty() {
            return Err(ConfigDecodeError::Empty);
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encodes the snapshot for persistence.
    pub fn encode(&self) -> Result<Vec<u8>, ConfigDecodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Looks up the placement for `(category, name)`.
    ///
    /// Singleton categories match only when the configured entry carries the
    /// requested name; list categories search by name in document order.
    pub fn placement(&self, category: AdCategory, name: &str) -> Option<&PlacementConfig> {
        match category {
            AdCategory::Splash => self.splash.as_ref().filter(|p| p.name == name),
            AdCategory::AppOpen => self.app_open.as_ref().filter(|p| p.name == name),
            AdCategory::Interstitial => self.interstitials.iter().find(|p| p.name == name),
            AdCategory::Rewarded => self.rewardeds.iter().find(|p| p.name == name),
            AdCategory::RewardedInterstitial => {
                self.rewarded_interstitials.iter().find(|p| p.name == name)
            }
            AdCategory::Native => self.natives.iter().find(|p| p.name == name),
            AdCategory::Banner => self.banners.iter().find(|p| p.name == name),
        }
    }

    /// Total number of configured placements across all categories.
    pub fn placement_count(&self) -> usize {
        usize::from(self.splash.is_some())
            + usize::from(self.app_open.is_some())
            + self.interstitials.len()
            + self.rewardeds.len()
            + self.rewarded_interstitials.len()
            + self.natives.len()
            + self.banners.len()
    }
}
