//! In-memory battlefield
//!
//! A self-contained [`GameView`] used by replays and tests. Hosts embedding
//! the analytics in a real game implement `GameView` over their own state.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::board::hex::HexCoord;
use crate::board::unit::Unit;
use crate::board::view::GameView;
use crate::core::error::{AnalyticsError, Result};
use crate::core::types::{TeamId, Turn, UnitId};

/// Plasma pool held by one team
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerPool {
    pub team: TeamId,
    pub plasma: f32,
}

/// Battlefield as stored in roster files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub turn: Turn,
    #[serde(default)]
    pub players: Vec<PlayerPool>,
    #[serde(default)]
    pub hazards: Vec<HexCoord>,
    /// Activation order; derived from initiative when absent
    #[serde(default)]
    pub queue: Vec<UnitId>,
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone)]
pub struct Battlefield {
    pub width: u32,
    pub height: u32,
    turn: Turn,
    units: Vec<Unit>,
    hazards: AHashSet<HexCoord>,
    queue: Vec<UnitId>,
    players: Vec<PlayerPool>,
}

impl Battlefield {
    /// Create an empty battlefield
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            turn: 0,
            units: Vec::new(),
            hazards: AHashSet::new(),
            queue: Vec::new(),
            players: Vec::new(),
        }
    }

    /// Build from a roster, validating ids and positions
    pub fn from_roster(roster: Roster) -> Result<Self> {
        let mut field = Battlefield::new(roster.width, roster.height);
        field.turn = roster.turn;
        field.players = roster.players;
        field.hazards = roster.hazards.into_iter().collect();
        for unit in roster.units {
            field.add_unit(unit)?;
        }
        if !roster.queue.is_empty() {
            if let Some(missing) = roster.queue.iter().find(|id| field.unit(**id).is_none()) {
                return Err(AnalyticsError::InvalidRoster(format!(
                    "queue references unknown unit {}",
                    missing
                )));
            }
            field.queue = roster.queue;
        }
        Ok(field)
    }

    pub fn from_roster_json(text: &str) -> Result<Self> {
        let roster: Roster = serde_json::from_str(text)?;
        Self::from_roster(roster)
    }

    pub fn load_roster(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_roster_json(&text)
    }

    /// Add a unit; it joins the activation queue by initiative
    pub fn add_unit(&mut self, unit: Unit) -> Result<()> {
        if self.units.iter().any(|u| u.id == unit.id) {
            return Err(AnalyticsError::InvalidRoster(format!(
                "duplicate unit id {}",
                unit.id
            )));
        }
        if let Some(hex) = unit.occupied_hexes().into_iter().find(|h| !self.in_bounds(*h)) {
            return Err(AnalyticsError::InvalidRoster(format!(
                "unit {} occupies out-of-bounds hex {}",
                unit.id, hex
            )));
        }
        if !self.players.iter().any(|p| p.team == unit.team) {
            self.players.push(PlayerPool {
                team: unit.team,
                plasma: 0.0,
            });
        }
        self.units.push(unit);
        self.rebuild_queue();
        Ok(())
    }

    /// Order the queue by initiative, highest first, ties by id
    fn rebuild_queue(&mut self) {
        let mut alive: Vec<&Unit> = self.units.iter().filter(|u| u.alive).collect();
        alive.sort_by(|a, b| {
            b.stats
                .initiative
                .total_cmp(&a.stats.initiative)
                .then(a.id.cmp(&b.id))
        });
        self.queue = alive.into_iter().map(|u| u.id).collect();
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn add_hazard(&mut self, hex: HexCoord) {
        self.hazards.insert(hex);
    }

    pub fn set_plasma(&mut self, team: TeamId, plasma: f32) {
        match self.players.iter_mut().find(|p| p.team == team) {
            Some(pool) => pool.plasma = plasma,
            None => self.players.push(PlayerPool { team, plasma }),
        }
    }

    pub fn set_turn(&mut self, turn: Turn) {
        self.turn = turn;
    }

    /// Advance one turn: rotate the queue and refresh the next active unit
    ///
    /// Returns the unit whose activation begins.
    pub fn advance_turn(&mut self) -> Option<UnitId> {
        self.turn += 1;
        self.queue.retain(|id| self.units.iter().any(|u| u.id == *id && u.alive));
        if self.queue.is_empty() {
            return None;
        }
        self.queue.rotate_left(1);
        let next = self.queue[0];
        if let Some(unit) = self.unit_mut(next) {
            unit.refresh_abilities();
        }
        Some(next)
    }

    /// The unit at the head of the queue
    pub fn active_unit(&self) -> Option<UnitId> {
        self.queue.first().copied()
    }

    /// Move a unit, rejecting occupied, hazardous or out-of-bounds targets
    pub fn move_unit(&mut self, id: UnitId, to: HexCoord) -> Result<HexCoord> {
        let unit = self.unit(id).ok_or(AnalyticsError::UnitNotFound(id))?;
        let footprint = unit.footprint_at(to);
        let blocked = footprint.iter().any(|h| {
            !self.in_bounds(*h)
                || self.is_hazard(*h)
                || self.unit_at(*h).map_or(false, |other| other.id != id)
        });
        if blocked {
            return Err(AnalyticsError::InvalidRoster(format!(
                "unit {} cannot move to {}",
                id, to
            )));
        }
        let unit = self.unit_mut(id).ok_or(AnalyticsError::UnitNotFound(id))?;
        let from = unit.position;
        unit.position = to;
        Ok(from)
    }

    /// Apply damage and drop dead units from the queue
    pub fn apply_damage(&mut self, id: UnitId, amount: f32) -> Result<f32> {
        let unit = self.unit_mut(id).ok_or(AnalyticsError::UnitNotFound(id))?;
        unit.health = (unit.health - amount).max(0.0);
        let remaining = unit.health;
        if remaining <= 0.0 {
            unit.alive = false;
            self.queue.retain(|q| *q != id);
        }
        Ok(remaining)
    }

    pub fn to_roster(&self) -> Roster {
        let mut hazards: Vec<HexCoord> = self.hazards.iter().copied().collect();
        hazards.sort();
        Roster {
            width: self.width,
            height: self.height,
            turn: self.turn,
            players: self.players.clone(),
            hazards,
            queue: self.queue.clone(),
            units: self.units.clone(),
        }
    }
}

impl GameView for Battlefield {
    fn turn(&self) -> Turn {
        self.turn
    }

    fn units(&self) -> &[Unit] {
        &self.units
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_hazard(&self, hex: HexCoord) -> bool {
        self.hazards.contains(&hex)
    }

    fn queue(&self) -> &[UnitId] {
        &self.queue
    }

    fn team_plasma(&self, team: TeamId) -> f32 {
        self.players
            .iter()
            .find(|p| p.team == team)
            .map_or(0.0, |p| p.plasma)
    }

    fn teams(&self) -> Vec<TeamId> {
        self.players.iter().map(|p| p.team).collect()
    }
}
