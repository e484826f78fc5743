//! Feedback from analysis results into the decision weights

use serde::{Deserialize, Serialize};

use crate::core::config::AnalyticsConfig;
use crate::weights::decision::WeightSystem;

/// Tactical multiplier targets
pub const TACTICAL_PATHS: [&str; 2] = ["tactical.damage.burst", "tactical.positioning.safety"];
/// Strategic multiplier targets
pub const STRATEGIC_PATHS: [&str; 2] = ["strategic.map_control.center", "strategic.tempo.initiative"];
/// Situational multiplier targets
pub const SITUATIONAL_PATHS: [&str; 2] = ["situational.health.critical", "situational.position.trapped"];

/// What one decision cycle measured
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedbackInputs {
    pub threat_level: f32,
    pub position_quality: f32,
    pub resource_efficiency: f32,
    pub pattern_confidence: f32,
    /// Zone-control factor of the unit's position, -1 to 1
    pub position_control: f32,
    /// Energy regeneration factor (meditation / 10)
    pub energy_regeneration: f32,
    /// The most dangerous incoming threat would kill the unit
    pub will_kill: bool,
    /// Positional safety below 0.3
    pub unsafe_position: bool,
    /// Fatigue risk above 0.7
    pub fatigue_danger: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightModifiers {
    pub tactical: f32,
    pub strategic: f32,
    pub situational: f32,
}

impl Default for WeightModifiers {
    fn default() -> Self {
        Self {
            tactical: 1.0,
            strategic: 1.0,
            situational: 1.0,
        }
    }
}

fn indicator(flag: bool) -> f32 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Turns measurements into bounded multipliers and applies them
///
/// Application compounds: each call scales the current weights, so repeated
/// cycles keep pushing in the same direction until the table is reset.
#[derive(Debug, Clone, Copy)]
pub struct WeightFeedbackLoop {
    min_multiplier: f32,
    max_multiplier: f32,
}

impl Default for WeightFeedbackLoop {
    fn default() -> Self {
        Self {
            min_multiplier: 0.5,
            max_multiplier: 2.0,
        }
    }
}

impl WeightFeedbackLoop {
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self {
            min_multiplier: config.feedback_min_multiplier,
            max_multiplier: config.feedback_max_multiplier,
        }
    }

    fn bound(&self, value: f32) -> f32 {
        if value.is_nan() {
            return 1.0;
        }
        value.clamp(self.min_multiplier, self.max_multiplier)
    }

    pub fn modifiers(&self, inputs: &FeedbackInputs) -> WeightModifiers {
        let tactical = 1.0
            + 0.4 * inputs.threat_level
            + 0.3 * (1.0 - inputs.position_quality)
            + 0.3 * (1.0 - inputs.resource_efficiency);
        let strategic = 1.0
            + 0.4 * inputs.pattern_confidence
            + 0.3 * inputs.position_control
            + 0.3 * inputs.energy_regeneration;
        let situational = 1.0
            + 0.4 * indicator(inputs.will_kill)
            + 0.3 * indicator(inputs.unsafe_position)
            + 0.3 * indicator(inputs.fatigue_danger);

        WeightModifiers {
            tactical: self.bound(tactical),
            strategic: self.bound(strategic),
            situational: self.bound(situational),
        }
    }

    /// Scale the fixed weight subsets in place
    pub fn apply(&self, weights: &mut WeightSystem, modifiers: &WeightModifiers) {
        let groups = [
            (TACTICAL_PATHS, modifiers.tactical),
            (STRATEGIC_PATHS, modifiers.strategic),
            (SITUATIONAL_PATHS, modifiers.situational),
        ];
        for (paths, factor) in groups {
            for path in paths {
                if let Err(e) = weights.scale(path, factor) {
                    tracing::warn!(weight = path, error = %e, "Failed to apply weight modifier");
                }
            }
        }
        tracing::debug!(
            tactical = modifiers.tactical,
            strategic = modifiers.strategic,
            situational = modifiers.situational,
            "Applied weight modifiers"
        );
    }
}
