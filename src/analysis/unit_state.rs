//! Unit-state snapshot: health, energy, fatigue and offensive profile

use serde::{Deserialize, Serialize};

use crate::board::unit::{Masteries, Unit};
use crate::core::types::UnitId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityOption {
    pub name: String,
    pub energy_cost: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueState {
    pub is_fatigued: bool,
    pub endurance: f32,
    pub max_endurance: f32,
    pub protected_from_fatigue: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffensiveCapability {
    pub offense: f32,
    pub defense: f32,
    pub initiative: f32,
    pub masteries: Masteries,
}

/// Point-in-time state of one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStateSnapshot {
    pub unit_id: UnitId,
    pub current_health: f32,
    pub max_health: f32,
    /// 0-100
    pub health_percentage: f32,
    pub current_energy: f32,
    pub max_energy: f32,
    /// 0-100
    pub energy_percentage: f32,
    pub meditation: f32,
    /// Unused abilities the unit can currently pay for
    pub possible_abilities: Vec<AbilityOption>,
    pub used_abilities: Vec<String>,
    pub fatigue: FatigueState,
    pub offensive: OffensiveCapability,
}

impl UnitStateSnapshot {
    pub fn capture(unit: &Unit) -> Self {
        Self {
            unit_id: unit.id,
            current_health: unit.health,
            max_health: unit.stats.health,
            health_percentage: unit.health_ratio() * 100.0,
            current_energy: unit.energy,
            max_energy: unit.stats.energy,
            energy_percentage: unit.energy_ratio() * 100.0,
            meditation: unit.stats.meditation,
            possible_abilities: unit
                .usable_abilities()
                .map(|a| AbilityOption {
                    name: a.title.clone(),
                    energy_cost: a.costs.energy,
                })
                .collect(),
            used_abilities: unit.used_abilities().map(|a| a.title.clone()).collect(),
            fatigue: FatigueState {
                is_fatigued: unit.is_fatigued(),
                endurance: unit.endurance,
                max_endurance: unit.stats.endurance,
                protected_from_fatigue: unit.protected_from_fatigue,
            },
            offensive: OffensiveCapability {
                offense: unit.stats.offense,
                defense: unit.stats.defense,
                initiative: unit.stats.initiative,
                masteries: unit.stats.masteries,
            },
        }
    }

    /// Resource pressure: energy below 30% or health below 40%
    pub fn is_resource_pressured(&self) -> bool {
        self.energy_percentage < 30.0 || self.health_percentage < 40.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ability::Ability;
    use crate::board::hex::HexCoord;

    #[test]
    fn test_capture_splits_possible_and_used() {
        let mut unit = Unit::new(1, "Priest", 0, HexCoord::new(0, 0))
            .with_ability(Ability::new("Cheap").with_costs(10.0, 0.0))
            .with_ability(Ability::new("Costly").with_costs(500.0, 0.0))
            .with_ability(Ability::new("Spent"));
        if let Some(a) = unit.ability_mut("Spent") {
            a.used = true;
        }

        let snapshot = UnitStateSnapshot::capture(&unit);
        let possible: Vec<&str> = snapshot
            .possible_abilities
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(possible, vec!["Cheap"]);
        assert_eq!(snapshot.used_abilities, vec!["Spent".to_string()]);
    }

    #[test]
    fn test_resource_pressure_thresholds() {
        let mut unit = Unit::new(1, "Priest", 0, HexCoord::new(0, 0));
        assert!(!UnitStateSnapshot::capture(&unit).is_resource_pressured());
        unit.health = 39.0;
        assert!(UnitStateSnapshot::capture(&unit).is_resource_pressured());
        unit.health = 100.0;
        unit.energy = 29.0;
        assert!(UnitStateSnapshot::capture(&unit).is_resource_pressured());
    }
}
