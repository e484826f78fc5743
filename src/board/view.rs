//! Read-only access to game state
//!
//! The analyzers never mutate the game. Everything they need is pulled through
//! [`GameView`], which the host game implements (or [`Battlefield`] for tests
//! and replays).
//!
//! [`Battlefield`]: crate::board::Battlefield

use crate::board::hex::HexCoord;
use crate::board::unit::Unit;
use crate::core::types::{TeamId, Turn, UnitId};

pub trait GameView {
    /// Current turn counter
    fn turn(&self) -> Turn;

    /// Every unit known to the game, dead ones included
    fn units(&self) -> &[Unit];

    /// Board extent; valid hexes are `0 <= q < width`, `0 <= r < height`
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Traps, drops and other hexes a unit should not enter
    fn is_hazard(&self, hex: HexCoord) -> bool;

    /// Activation order for the current round
    fn queue(&self) -> &[UnitId];

    /// Plasma pool of a team
    fn team_plasma(&self, team: TeamId) -> f32;

    /// Teams holding a plasma pool
    fn teams(&self) -> Vec<TeamId>;

    fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units().iter().find(|u| u.id == id)
    }

    fn living_units(&self) -> Vec<&Unit> {
        self.units().iter().filter(|u| u.alive).collect()
    }

    fn live_unit_count(&self) -> usize {
        self.units().iter().filter(|u| u.alive).count()
    }

    fn in_bounds(&self, hex: HexCoord) -> bool {
        hex.q >= 0 && hex.r >= 0 && hex.q < self.width() as i32 && hex.r < self.height() as i32
    }

    /// Living unit occupying `hex`
    fn unit_at(&self, hex: HexCoord) -> Option<&Unit> {
        self.units().iter().find(|u| u.alive && u.occupies(hex))
    }

    /// Combined plasma of every other team
    fn enemy_plasma(&self, team: TeamId) -> f32 {
        self.teams()
            .into_iter()
            .filter(|t| *t != team)
            .map(|t| self.team_plasma(t))
            .sum()
    }

    fn center(&self) -> HexCoord {
        HexCoord::new((self.width() / 2) as i32, (self.height() / 2) as i32)
    }

    /// Largest distance from the center still on the board's main axes
    fn max_center_distance(&self) -> u32 {
        (self.width() / 2).max(self.height() / 2).max(1)
    }

    /// Round number: turns divided by the number of units still alive
    fn round_number(&self) -> u32 {
        let live = self.live_unit_count() as u32;
        if live == 0 {
            0
        } else {
            self.turn() / live
        }
    }

    /// Position of a unit in the activation queue
    fn queue_index(&self, id: UnitId) -> Option<usize> {
        self.queue().iter().position(|q| *q == id)
    }
}
