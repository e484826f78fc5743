//! Dimension analyzers, control severity and the threat composer

pub mod ability;
pub mod context;
pub mod control;
pub mod pattern;
pub mod position;
pub mod resource;
pub mod threat;
pub mod unit_state;

pub use ability::{
    abilities_combo, analyze_ability, analyze_usage, AbilityThreatResult, AbilityUsageAnalysis,
    SummonedUnit,
};
pub use context::ControlContext;
pub use control::{classify_severity, ControlSeverity, EscalationFactors};
pub use pattern::{PatternDetector, PatternKind, ThreatPattern};
pub use position::{evaluate_movement, MovementEvaluation, Placement, PositionAnalyzer, PositionQuality};
pub use resource::{ResourceAnalysis, ResourceAnalyzer};
pub use threat::{assess, assess_threats_to, ThreatAssessment, ThreatType};
pub use unit_state::UnitStateSnapshot;
