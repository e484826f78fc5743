//! Hex Threat Analytics - combat threat intelligence for turn-based hex tactics
//!
//! Game events go in through [`orchestrator::AnalyticsOrchestrator`]; per-unit
//! profiles, detected patterns and tuned decision weights come out.

pub mod analysis;
pub mod board;
pub mod cache;
pub mod core;
pub mod events;
pub mod orchestrator;
pub mod profile;
pub mod weights;

pub use crate::core::{AnalyticsConfig, AnalyticsError, Result};
pub use events::{GameEvent, TimedEvent};
pub use orchestrator::{AnalysisResult, AnalyticsOrchestrator, EventOutcome};
