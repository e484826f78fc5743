//! Movement tracking
//!
//! The game may report a move as many small steps or as one finished move.
//! Steps are folded per unit and turn so both forms leave the same record.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::board::hex::HexCoord;
use crate::board::unit::Unit;
use crate::core::types::{Timestamp, Turn, UnitId};

const MOVEMENT_ABILITY_WORDS: [&str; 5] = ["move", "teleport", "jump", "dash", "charge"];

/// One observed position change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementStep {
    pub unit_id: UnitId,
    pub from: HexCoord,
    pub to: HexCoord,
}

/// A unit's combined move for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub unit_id: UnitId,
    pub turn: Turn,
    pub from: HexCoord,
    pub to: HexCoord,
    pub distance: u32,
    /// Ability that carried the unit, when the move was not a plain walk
    pub ability: Option<String>,
}

/// Title of the used ability that moved the unit, if any
pub fn movement_ability(unit: &Unit) -> Option<String> {
    unit.used_abilities()
        .find(|a| {
            let title = a.title.to_lowercase();
            MOVEMENT_ABILITY_WORDS.iter().any(|w| title.contains(w))
        })
        .map(|a| a.title.clone())
}

#[derive(Debug, Clone, Copy)]
struct PendingMove {
    turn: Turn,
    from: HexCoord,
    to: HexCoord,
    steps: u32,
}

/// Folds movement steps into one record per unit and turn
#[derive(Debug, Default)]
pub struct MovementTracker {
    pending: AHashMap<UnitId, PendingMove>,
}

impl MovementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a step (or a whole move) into the unit's move for `turn`
    ///
    /// Returns the combined move so far. A step from an earlier turn starts
    /// a fresh move.
    pub fn step(&mut self, unit: &Unit, turn: Turn, from: HexCoord, to: HexCoord) -> MovementRecord {
        let pending = self
            .pending
            .entry(unit.id)
            .and_modify(|p| {
                if p.turn == turn {
                    p.to = to;
                    p.steps += 1;
                } else {
                    *p = PendingMove {
                        turn,
                        from,
                        to,
                        steps: 1,
                    };
                }
            })
            .or_insert(PendingMove {
                turn,
                from,
                to,
                steps: 1,
            });

        MovementRecord {
            unit_id: unit.id,
            turn,
            from: pending.from,
            to: pending.to,
            distance: pending.from.distance(&pending.to),
            ability: movement_ability(unit),
        }
    }

    /// Steps folded into the unit's current move
    pub fn steps(&self, id: UnitId) -> u32 {
        self.pending.get(&id).map_or(0, |p| p.steps)
    }

    /// Forget moves from turns before `turn`
    pub fn end_turn(&mut self, turn: Turn) {
        self.pending.retain(|_, p| p.turn >= turn);
    }
}

/// Turns fixed-interval position polls into movement steps
///
/// Samples closer together than the interval are ignored.
#[derive(Debug)]
pub struct PositionSampler {
    interval_ms: u64,
    last: AHashMap<UnitId, (Timestamp, HexCoord)>,
}

impl PositionSampler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last: AHashMap::new(),
        }
    }

    pub fn sample(&mut self, unit_id: UnitId, at: Timestamp, position: HexCoord) -> Option<MovementStep> {
        match self.last.get(&unit_id).copied() {
            None => {
                self.last.insert(unit_id, (at, position));
                None
            }
            Some((last_at, _)) if at.saturating_sub(last_at) < self.interval_ms => None,
            Some((_, last_pos)) => {
                self.last.insert(unit_id, (at, position));
                (last_pos != position).then_some(MovementStep {
                    unit_id,
                    from: last_pos,
                    to: position,
                })
            }
        }
    }

    pub fn forget(&mut self, unit_id: UnitId) {
        self.last.remove(&unit_id);
    }
}
