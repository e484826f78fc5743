//! Control-severity classification
//!
//! A four-level scale derived from the strongest control flag, escalated by
//! the target's situation.

use serde::{Deserialize, Serialize};

use crate::analysis::context::ControlContext;
use crate::board::effects::ControlFlags;

/// Ordered severity of a control effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ControlSeverity {
    Minor = 1,
    Moderate = 2,
    Severe = 3,
    Critical = 4,
}

impl ControlSeverity {
    pub fn level(&self) -> u8 {
        *self as u8
    }

    fn from_level(level: u8) -> Self {
        match level {
            0 | 1 => ControlSeverity::Minor,
            2 => ControlSeverity::Moderate,
            3 => ControlSeverity::Severe,
            _ => ControlSeverity::Critical,
        }
    }

    /// Raise by `steps` levels, never past Critical
    pub fn escalate(self, steps: u8) -> Self {
        Self::from_level(self.level().saturating_add(steps))
    }

    /// Share of the maximum severity, in (0, 1]
    pub fn fraction(&self) -> f32 {
        self.level() as f32 / ControlSeverity::Critical.level() as f32
    }
}

/// Severity from the strongest flag alone; None without control
pub fn base_severity(flags: ControlFlags) -> Option<ControlSeverity> {
    if flags.intersects(ControlFlags::FROZEN | ControlFlags::CRYOSTASIS | ControlFlags::NO_ACTION) {
        Some(ControlSeverity::Critical)
    } else if flags.intersects(ControlFlags::IMMOBILIZE | ControlFlags::TRAP) {
        Some(ControlSeverity::Severe)
    } else if flags.intersects(ControlFlags::DIZZY | ControlFlags::DELAYED | ControlFlags::HINDERED) {
        Some(ControlSeverity::Moderate)
    } else if flags.is_empty() {
        None
    } else {
        Some(ControlSeverity::Minor)
    }
}

/// Situational factors that make control worse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EscalationFactors {
    /// More than one melee unit adjacent
    pub melee_pressure: bool,
    pub near_hazard: bool,
    pub corner_trapped: bool,
    /// One escape route or fewer
    pub cornered: bool,
    /// Health under 30%
    pub low_health: bool,
}

impl EscalationFactors {
    pub fn from_context(context: &ControlContext) -> Self {
        let threat = &context.position_threat;
        Self {
            melee_pressure: threat.adjacent_melee_units > 1,
            near_hazard: threat.near_hazards,
            corner_trapped: threat.movement_constraints.corner_trapped,
            cornered: context.tactical_state.escape_routes <= 1,
            low_health: context.unit_state.health_percentage < 30.0,
        }
    }

    pub fn count(&self) -> u8 {
        [
            self.melee_pressure,
            self.near_hazard,
            self.corner_trapped,
            self.cornered,
            self.low_health,
        ]
        .iter()
        .filter(|f| **f)
        .count() as u8
    }
}

/// Base severity escalated one level per factor, capped at Critical
pub fn classify_severity(flags: ControlFlags, factors: &EscalationFactors) -> Option<ControlSeverity> {
    base_severity(flags).map(|base| base.escalate(factors.count()))
}

/// Expected number of turns the control lasts; 0 without control
pub fn estimate_duration(flags: ControlFlags) -> u32 {
    if flags.is_empty() {
        0
    } else if flags.contains(ControlFlags::CRYOSTASIS) {
        3
    } else if flags.intersects(ControlFlags::FROZEN | ControlFlags::IMMOBILIZE | ControlFlags::TRAP) {
        2
    } else {
        1
    }
}
