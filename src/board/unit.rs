//! Units on the battlefield

use serde::{Deserialize, Serialize};

use crate::board::ability::Ability;
use crate::board::effects::{classify_effects, EffectClass};
use crate::board::hex::{HexCoord, HexDirection};
use crate::core::types::{ratio, TeamId, UnitId};

/// Damage-type masteries
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Masteries {
    pub pierce: f32,
    pub slash: f32,
    pub crush: f32,
    pub shock: f32,
    pub burn: f32,
    pub frost: f32,
    pub poison: f32,
    pub sonic: f32,
    pub mental: f32,
}

/// Base (maximum) statistics of a unit type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    pub health: f32,
    pub regrowth: f32,
    pub endurance: f32,
    pub energy: f32,
    pub meditation: f32,
    pub initiative: f32,
    pub offense: f32,
    pub defense: f32,
    pub movement: u32,
    #[serde(flatten)]
    pub masteries: Masteries,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            health: 100.0,
            regrowth: 0.0,
            endurance: 50.0,
            energy: 100.0,
            meditation: 10.0,
            initiative: 50.0,
            offense: 5.0,
            defense: 5.0,
            movement: 3,
            masteries: Masteries::default(),
        }
    }
}

/// Raw unit record as it appears in roster files
///
/// Current pools default to the stat maximums.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitData {
    pub id: UnitId,
    pub name: String,
    pub team: TeamId,
    #[serde(default = "default_size")]
    pub size: u32,
    pub position: HexCoord,
    #[serde(default)]
    pub stats: UnitStats,
    #[serde(default)]
    pub health: Option<f32>,
    #[serde(default)]
    pub energy: Option<f32>,
    #[serde(default)]
    pub endurance: Option<f32>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub status_effects: Vec<String>,
    #[serde(default)]
    pub protected_from_fatigue: bool,
}

fn default_size() -> u32 {
    1
}

/// A combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "UnitData")]
pub struct Unit {
    pub id: UnitId,
    /// Unit type name; also the profile's unit type
    pub name: String,
    pub team: TeamId,
    /// Hexes occupied, extending westward from `position`
    pub size: u32,
    pub position: HexCoord,
    pub stats: UnitStats,
    pub health: f32,
    pub energy: f32,
    pub endurance: f32,
    pub abilities: Vec<Ability>,
    pub status_effects: Vec<String>,
    pub protected_from_fatigue: bool,
    pub alive: bool,
    status_class: EffectClass,
}

impl From<UnitData> for Unit {
    fn from(data: UnitData) -> Self {
        let status_class = classify_effects(&data.status_effects);
        Self {
            id: data.id,
            name: data.name,
            team: data.team,
            size: data.size.max(1),
            position: data.position,
            health: data.health.unwrap_or(data.stats.health),
            energy: data.energy.unwrap_or(data.stats.energy),
            endurance: data.endurance.unwrap_or(data.stats.endurance),
            stats: data.stats,
            abilities: data.abilities,
            status_effects: data.status_effects,
            protected_from_fatigue: data.protected_from_fatigue,
            alive: true,
            status_class,
        }
    }
}

impl Unit {
    pub fn new(id: u32, name: impl Into<String>, team: u8, position: HexCoord) -> Self {
        let stats = UnitStats::default();
        Self::from(UnitData {
            id: UnitId(id),
            name: name.into(),
            team: TeamId(team),
            size: 1,
            position,
            stats,
            health: None,
            energy: None,
            endurance: None,
            abilities: Vec::new(),
            status_effects: Vec::new(),
            protected_from_fatigue: false,
        })
    }

    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    pub fn with_stats(mut self, stats: UnitStats) -> Self {
        self.stats = stats;
        self.health = stats.health;
        self.energy = stats.energy;
        self.endurance = stats.endurance;
        self
    }

    pub fn add_status_effect(&mut self, text: impl Into<String>) {
        self.status_effects.push(text.into());
        self.status_class = classify_effects(&self.status_effects);
    }

    /// Classified status effects currently on the unit
    pub fn status(&self) -> EffectClass {
        self.status_class
    }

    pub fn health_ratio(&self) -> f32 {
        ratio(self.health, self.stats.health)
    }

    pub fn energy_ratio(&self) -> f32 {
        ratio(self.energy, self.stats.energy)
    }

    pub fn endurance_ratio(&self) -> f32 {
        if self.protected_from_fatigue {
            return 1.0;
        }
        ratio(self.endurance, self.stats.endurance)
    }

    pub fn is_fatigued(&self) -> bool {
        !self.protected_from_fatigue && self.endurance <= 0.0
    }

    pub fn ability(&self, title: &str) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.title == title)
    }

    pub fn ability_mut(&mut self, title: &str) -> Option<&mut Ability> {
        self.abilities.iter_mut().find(|a| a.title == title)
    }

    pub fn unused_abilities(&self) -> impl Iterator<Item = &Ability> {
        self.abilities.iter().filter(|a| !a.used)
    }

    pub fn used_abilities(&self) -> impl Iterator<Item = &Ability> {
        self.abilities.iter().filter(|a| a.used)
    }

    /// Most recently used ability, if any ability has been used this turn
    pub fn last_used_ability(&self) -> Option<&Ability> {
        self.abilities.iter().rev().find(|a| a.used)
    }

    /// Unused abilities whose cost the unit can currently pay
    pub fn usable_abilities(&self) -> impl Iterator<Item = &Ability> {
        self.unused_abilities()
            .filter(move |a| a.costs.energy <= self.energy)
    }

    /// Has an unused one-hex ability, which makes it a melee threat when adjacent
    pub fn has_melee_ability(&self) -> bool {
        self.unused_abilities().any(|a| a.is_melee())
    }

    /// Hexes occupied if the unit stood at `anchor`
    pub fn footprint_at(&self, anchor: HexCoord) -> Vec<HexCoord> {
        let mut hexes = Vec::with_capacity(self.size as usize);
        let mut hex = anchor;
        for _ in 0..self.size {
            hexes.push(hex);
            hex = hex.step(HexDirection::West);
        }
        hexes
    }

    pub fn occupied_hexes(&self) -> Vec<HexCoord> {
        self.footprint_at(self.position)
    }

    pub fn occupies(&self, hex: HexCoord) -> bool {
        self.occupied_hexes().contains(&hex)
    }

    /// Distance from this unit's nearest occupied hex to `hex`
    pub fn distance_to_hex(&self, hex: HexCoord) -> u32 {
        self.occupied_hexes()
            .iter()
            .map(|h| h.distance(&hex))
            .min()
            .unwrap_or(u32::MAX)
    }

    /// Closest distance between the footprints of two units
    pub fn distance_to(&self, other: &Unit) -> u32 {
        other
            .occupied_hexes()
            .iter()
            .map(|h| self.distance_to_hex(*h))
            .min()
            .unwrap_or(u32::MAX)
    }

    pub fn is_enemy_of(&self, other: &Unit) -> bool {
        self.team != other.team
    }

    /// Reset per-turn ability usage
    pub fn refresh_abilities(&mut self) {
        for ability in &mut self.abilities {
            ability.used = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pools_default_to_stats() {
        let unit = Unit::new(1, "Scout", 0, HexCoord::new(2, 2));
        assert_eq!(unit.health, unit.stats.health);
        assert_eq!(unit.health_ratio(), 1.0);
        assert_eq!(unit.energy_ratio(), 1.0);
    }

    #[test]
    fn test_large_unit_footprint_extends_west() {
        let mut unit = Unit::new(2, "Golem", 1, HexCoord::new(5, 3));
        unit.size = 3;
        assert_eq!(
            unit.occupied_hexes(),
            vec![HexCoord::new(5, 3), HexCoord::new(4, 3), HexCoord::new(3, 3)]
        );
        assert!(unit.occupies(HexCoord::new(3, 3)));
        assert_eq!(unit.distance_to_hex(HexCoord::new(2, 3)), 1);
    }

    #[test]
    fn test_last_used_ability() {
        let mut unit = Unit::new(3, "Priest", 0, HexCoord::new(0, 0))
            .with_ability(Ability::new("Bolt"))
            .with_ability(Ability::new("Ward"));
        assert!(unit.last_used_ability().is_none());
        if let Some(a) = unit.ability_mut("Bolt") {
            a.used = true;
        }
        assert_eq!(unit.last_used_ability().map(|a| a.title.as_str()), Some("Bolt"));
        unit.refresh_abilities();
        assert!(unit.last_used_ability().is_none());
    }

    #[test]
    fn test_protected_unit_never_fatigued() {
        let mut unit = Unit::new(4, "Priest", 0, HexCoord::new(0, 0));
        unit.endurance = 0.0;
        assert!(unit.is_fatigued());
        unit.protected_from_fatigue = true;
        assert!(!unit.is_fatigued());
        assert_eq!(unit.endurance_ratio(), 1.0);
    }

    #[test]
    fn test_roster_json_defaults() {
        let json = r#"{
            "id": 9, "name": "Swine Thug", "team": 1,
            "position": { "q": 4, "r": 4 },
            "stats": { "health": 80, "energy": 50, "movement": 2, "crush": 6 },
            "health": 40,
            "abilities": [{ "title": "Bash", "damages": { "crush": 14 }, "range": { "regular": 1 } }]
        }"#;
        let unit: Unit = serde_json::from_str(json).unwrap();
        assert_eq!(unit.health_ratio(), 0.5);
        assert_eq!(unit.energy, 50.0);
        assert_eq!(unit.stats.masteries.crush, 6.0);
        assert!(unit.has_melee_ability());
        assert!(unit.alive);
    }
}
