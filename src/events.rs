//! Inbound game events
//!
//! Events carry unit references, not units. They are resolved against the
//! game view when handled; anything that no longer resolves is dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::hex::HexCoord;
use crate::core::types::{Timestamp, UnitId};
use crate::profile::recorder::EffectTarget;

/// Events emitted by the rules engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    /// A unit used one of its abilities
    AbilityUsed {
        source: UnitId,
        ability: String,
        target: Option<UnitId>,
    },
    /// Damage dealt, per damage type
    Damage {
        source: UnitId,
        target: UnitId,
        damages: BTreeMap<String, f32>,
    },
    /// A status effect was attached to a unit or a hex
    EffectAttach {
        source: UnitId,
        effect: String,
        target: EffectTarget,
    },
    /// A unit's activation began
    Activate { unit: UnitId },
    Summon {
        summoner: UnitId,
        summoned: UnitId,
        ability: String,
    },
    /// One sampled step of a move in progress
    MovementStep {
        unit: UnitId,
        from: HexCoord,
        to: HexCoord,
    },
    /// A whole move, already combined
    MovementComplete {
        unit: UnitId,
        from: HexCoord,
        to: HexCoord,
    },
}

impl GameEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::AbilityUsed { .. } => "ability_used",
            GameEvent::Damage { .. } => "damage",
            GameEvent::EffectAttach { .. } => "effect_attach",
            GameEvent::Activate { .. } => "activate",
            GameEvent::Summon { .. } => "summon",
            GameEvent::MovementStep { .. } => "movement_step",
            GameEvent::MovementComplete { .. } => "movement_complete",
        }
    }

    /// The unit whose profile the event updates
    pub fn actor(&self) -> UnitId {
        match self {
            GameEvent::AbilityUsed { source, .. }
            | GameEvent::Damage { source, .. }
            | GameEvent::EffectAttach { source, .. } => *source,
            GameEvent::Summon { summoner, .. } => *summoner,
            GameEvent::Activate { unit }
            | GameEvent::MovementStep { unit, .. }
            | GameEvent::MovementComplete { unit, .. } => *unit,
        }
    }
}

/// An event with the time it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub event: GameEvent,
}
