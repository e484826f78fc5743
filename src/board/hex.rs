//! Hex coordinate system for the battlefield (axial coordinates)
//!
//! Uses axial coordinates (q, r) for easy neighbor calculation.

use serde::{Deserialize, Serialize};

/// Axial hex coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r)
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Manhattan distance in hex space
    pub fn distance(&self, other: &Self) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Neighbor in the given direction
    pub fn step(&self, direction: HexDirection) -> Self {
        *self + direction.offset()
    }

    /// Get all 6 neighboring hex coordinates, in `HexDirection::all()` order
    pub fn neighbors(&self) -> [HexCoord; 6] {
        HexDirection::all().map(|d| self.step(d))
    }

    /// Get all hexes within range (inclusive, includes self)
    pub fn hexes_in_range(&self, range: u32) -> Vec<HexCoord> {
        let range = range as i32;
        let mut results = Vec::new();
        for q in -range..=range {
            for r in (-range).max(-q - range)..=range.min(-q + range) {
                results.push(HexCoord::new(self.q + q, self.r + r));
            }
        }
        results
    }

    /// Hexes within range, excluding self
    pub fn ring_area(&self, range: u32) -> Vec<HexCoord> {
        self.hexes_in_range(range)
            .into_iter()
            .filter(|h| h != self)
            .collect()
    }
}

impl std::ops::Add for HexCoord {
    type Output = HexCoord;

    fn add(self, other: HexCoord) -> HexCoord {
        HexCoord::new(self.q + other.q, self.r + other.r)
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// The six hex directions, in ring order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum HexDirection {
    #[default]
    East,
    NorthEast,
    NorthWest,
    West,
    SouthWest,
    SouthEast,
}

impl HexDirection {
    /// Get the hex offset for this direction
    pub fn offset(&self) -> HexCoord {
        match self {
            HexDirection::East => HexCoord::new(1, 0),
            HexDirection::NorthEast => HexCoord::new(1, -1),
            HexDirection::NorthWest => HexCoord::new(0, -1),
            HexDirection::West => HexCoord::new(-1, 0),
            HexDirection::SouthWest => HexCoord::new(-1, 1),
            HexDirection::SouthEast => HexCoord::new(0, 1),
        }
    }

    /// Get opposite direction
    pub fn opposite(&self) -> Self {
        match self {
            HexDirection::East => HexDirection::West,
            HexDirection::NorthEast => HexDirection::SouthWest,
            HexDirection::NorthWest => HexDirection::SouthEast,
            HexDirection::West => HexDirection::East,
            HexDirection::SouthWest => HexDirection::NorthEast,
            HexDirection::SouthEast => HexDirection::NorthWest,
        }
    }

    /// All directions
    pub fn all() -> [HexDirection; 6] {
        [
            HexDirection::East,
            HexDirection::NorthEast,
            HexDirection::NorthWest,
            HexDirection::West,
            HexDirection::SouthWest,
            HexDirection::SouthEast,
        ]
    }

    /// Closest of the six directions for the vector `from -> to`
    ///
    /// Returns None when both coordinates are the same hex.
    pub fn toward(from: HexCoord, to: HexCoord) -> Option<HexDirection> {
        if from == to {
            return None;
        }
        let (dq, dr, ds) = (to.q - from.q, to.r - from.r, to.s() - from.s());
        HexDirection::all().into_iter().max_by_key(|d| {
            let o = d.offset();
            dq * o.q + dr * o.r + ds * o.s()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_distance_same() {
        let a = HexCoord::new(0, 0);
        assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn test_hex_distance_adjacent() {
        let a = HexCoord::new(0, 0);
        for n in a.neighbors() {
            assert_eq!(a.distance(&n), 1);
        }
    }

    #[test]
    fn test_hexes_in_range() {
        let center = HexCoord::new(0, 0);
        assert_eq!(center.hexes_in_range(1).len(), 7);
        assert_eq!(center.hexes_in_range(2).len(), 19);
        assert_eq!(center.ring_area(2).len(), 18);
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(HexDirection::East.opposite(), HexDirection::West);
        assert_eq!(HexDirection::NorthEast.opposite(), HexDirection::SouthWest);
    }

    #[test]
    fn test_toward_matches_neighbor_direction() {
        let origin = HexCoord::new(3, 3);
        for d in HexDirection::all() {
            assert_eq!(HexDirection::toward(origin, origin.step(d)), Some(d));
        }
        assert_eq!(HexDirection::toward(origin, origin), None);
    }

    #[test]
    fn test_toward_far_target() {
        let origin = HexCoord::new(0, 0);
        assert_eq!(
            HexDirection::toward(origin, HexCoord::new(4, 0)),
            Some(HexDirection::East)
        );
    }
}
