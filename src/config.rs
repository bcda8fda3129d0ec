/// Collection configuration.
use crate::error::CollectionResult;
use crate::threshold::DEFAULT_RESET_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Notification settings shared by all collection flavors.
///
/// The delivery scheduler is not part of this struct; it is injected
/// separately because it is a live object rather than data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Number of affected items at or above which a bulk change is reported
    /// as a single reset (default: 100). Zero always resets.
    pub reset_threshold: usize,

    /// Return subscriber faults to the mutating caller after reporting them
    /// on the unhandled-error stream (default: true).
    pub throw_on_observer_errors: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            reset_threshold: DEFAULT_RESET_THRESHOLD,
            throw_on_observer_errors: true,
        }
    }
}

impl CollectionConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> CollectionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the reset threshold.
    pub fn with_reset_threshold(mut self, threshold: usize) -> Self {
        self.reset_threshold = threshold;
        self
    }

    /// Set whether subscriber faults are returned to the caller.
    pub fn throw_on_observer_errors(mut self, enabled: bool) -> Self {
        self.throw_on_observer_errors = enabled;
        self
    }
}
