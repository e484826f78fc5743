//! Analytics configuration with documented constants
//!
//! The scoring constants of the analyzers are fixed; what lives here are the
//! knobs that bound memory and tune how eagerly results are surfaced.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{AnalyticsError, Result};

/// Configuration for the analytics engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    // === PROFILE HISTORY ===
    /// Maximum snapshots retained per unit profile
    ///
    /// Only the most recent `pattern_window` entries are ever read, so the
    /// ring buffer only needs to be comfortably larger than that. Older
    /// snapshots are evicted oldest-first.
    pub history_capacity: usize,

    /// Snapshots considered when recomputing vulnerabilities and strengths
    pub vulnerability_window: usize,

    // === PATTERN DETECTION ===
    /// Snapshots scanned by the pattern detector
    pub pattern_window: usize,

    /// Patterns at or below this frequency are discarded
    ///
    /// At 0.3 a pattern must show up in at least four of ten snapshots
    /// before it is reported.
    pub pattern_frequency_threshold: f32,

    // === CACHE ===
    /// Soft ceiling for the turn-scoped snapshot cache
    ///
    /// Entries are invalidated on turn and ability boundaries anyway. The
    /// ceiling only matters for very long turns with many evaluations.
    pub cache_max_entries: usize,

    // === MOVEMENT ===
    /// Interval at which an external poller samples unit positions (ms)
    pub movement_sample_interval_ms: u64,

    // === RESOURCES ===
    /// Resource samples kept per unit for timing analysis
    pub resource_history_len: usize,

    // === WEIGHT FEEDBACK ===
    /// Lower bound for every feedback multiplier
    pub feedback_min_multiplier: f32,

    /// Upper bound for every feedback multiplier
    pub feedback_max_multiplier: f32,

    /// Ceiling for situational weights after compounding
    ///
    /// Situational weights are multipliers (base values up to 1.5) and may
    /// legitimately exceed 1, so they are clamped here instead of to [0, 1].
    pub situational_weight_ceiling: f32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            history_capacity: 200,
            vulnerability_window: 5,

            pattern_window: 10,
            pattern_frequency_threshold: 0.3,

            cache_max_entries: 4096,

            movement_sample_interval_ms: 50,

            resource_history_len: 10,

            feedback_min_multiplier: 0.5,
            feedback_max_multiplier: 2.0,
            situational_weight_ceiling: 3.0,
        }
    }
}

impl AnalyticsConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AnalyticsConfig = toml::from_str(text)?;
        config.validate().map_err(AnalyticsError::InvalidConfig)?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.vulnerability_window == 0 || self.pattern_window == 0 {
            return Err("Analysis windows must be at least one snapshot".into());
        }

        // The ring buffer must hold every window that reads from it
        let widest = self.vulnerability_window.max(self.pattern_window);
        if self.history_capacity < widest {
            return Err(format!(
                "history_capacity ({}) should be >= the widest analysis window ({})",
                self.history_capacity, widest
            ));
        }

        if !(0.0..1.0).contains(&self.pattern_frequency_threshold) {
            return Err(format!(
                "pattern_frequency_threshold ({}) must be in [0, 1)",
                self.pattern_frequency_threshold
            ));
        }

        if self.feedback_min_multiplier <= 0.0
            || self.feedback_min_multiplier > 1.0
            || self.feedback_max_multiplier < 1.0
        {
            return Err(format!(
                "feedback multiplier bounds ({}, {}) must straddle 1.0",
                self.feedback_min_multiplier, self.feedback_max_multiplier
            ));
        }

        if self.situational_weight_ceiling < 1.5 {
            return Err(format!(
                "situational_weight_ceiling ({}) is below the base critical-health weight (1.5)",
                self.situational_weight_ceiling
            ));
        }

        if self.movement_sample_interval_ms == 0 {
            return Err("movement_sample_interval_ms must be positive".into());
        }

        Ok(())
    }
}
