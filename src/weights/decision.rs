//! Decision-weight table consumed by the downstream option scorer
//!
//! Weights are addressed by dotted paths such as `tactical.damage.burst`.
//! Tactical and strategic weights live in [0, 1]. Situational weights are
//! multipliers and may exceed 1, up to a configured ceiling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::unit::Unit;
use crate::core::error::{AnalyticsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageWeights {
    pub burst: f32,
    pub sustained: f32,
    pub aoe: f32,
    /// Securing kills
    pub finishing: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlWeights {
    pub immobilize: f32,
    pub zone: f32,
    pub debuff: f32,
    pub denial: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositioningWeights {
    pub safety: f32,
    pub threat: f32,
    pub objective: f32,
    pub support: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceWeights {
    pub energy: f32,
    pub plasma: f32,
    pub endurance: f32,
}

/// Weights for the current activation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TacticalWeights {
    pub damage: DamageWeights,
    pub control: ControlWeights,
    pub positioning: PositioningWeights,
    pub resources: ResourceWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamCompWeights {
    pub synergy: f32,
    pub coverage: f32,
    pub formation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapControlWeights {
    pub center: f32,
    pub zones: f32,
    pub mobility: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceControlWeights {
    pub generation: f32,
    pub denial: f32,
    pub efficiency: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoWeights {
    pub initiative: f32,
    pub pressure: f32,
    pub recovery: f32,
}

/// Weights for the game as a whole
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategicWeights {
    pub team_comp: TeamCompWeights,
    pub map_control: MapControlWeights,
    pub resource_control: ResourceControlWeights,
    pub tempo: TempoWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthModifiers {
    /// Applied below 30% health
    pub critical: f32,
    /// Applied above 80% health
    pub healthy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyModifiers {
    pub low: f32,
    pub high: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionModifiers {
    pub trapped: f32,
    pub dominant: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumModifiers {
    pub winning: f32,
    pub losing: f32,
}

/// Multipliers applied on top of the other tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SituationalWeights {
    pub health: HealthModifiers,
    pub energy: EnergyModifiers,
    pub position: PositionModifiers,
    pub momentum: MomentumModifiers,
}

/// The three-tier weight table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionWeights {
    pub tactical: TacticalWeights,
    pub strategic: StrategicWeights,
    pub situational: SituationalWeights,
}

impl Default for DecisionWeights {
    fn default() -> Self {
        Self {
            tactical: TacticalWeights {
                damage: DamageWeights {
                    burst: 0.7,
                    sustained: 0.5,
                    aoe: 0.6,
                    finishing: 0.8,
                },
                control: ControlWeights {
                    immobilize: 0.6,
                    zone: 0.7,
                    debuff: 0.5,
                    denial: 0.4,
                },
                positioning: PositioningWeights {
                    safety: 0.8,
                    threat: 0.6,
                    objective: 0.7,
                    support: 0.5,
                },
                resources: ResourceWeights {
                    energy: 0.7,
                    plasma: 0.6,
                    endurance: 0.5,
                },
            },
            strategic: StrategicWeights {
                team_comp: TeamCompWeights {
                    synergy: 0.6,
                    coverage: 0.5,
                    formation: 0.7,
                },
                map_control: MapControlWeights {
                    center: 0.7,
                    zones: 0.6,
                    mobility: 0.5,
                },
                resource_control: ResourceControlWeights {
                    generation: 0.6,
                    denial: 0.4,
                    efficiency: 0.7,
                },
                tempo: TempoWeights {
                    initiative: 0.7,
                    pressure: 0.6,
                    recovery: 0.5,
                },
            },
            situational: SituationalWeights {
                health: HealthModifiers {
                    critical: 1.5,
                    healthy: 0.8,
                },
                energy: EnergyModifiers { low: 1.3, high: 0.9 },
                position: PositionModifiers {
                    trapped: 1.4,
                    dominant: 0.8,
                },
                momentum: MomentumModifiers {
                    winning: 0.9,
                    losing: 1.2,
                },
            },
        }
    }
}

impl DecisionWeights {
    /// Every weight with its path, in table order
    fn leaves_mut(&mut self) -> Vec<(&'static str, &mut f32)> {
        let DecisionWeights {
            tactical,
            strategic,
            situational,
        } = self;
        vec![
            ("tactical.damage.burst", &mut tactical.damage.burst),
            ("tactical.damage.sustained", &mut tactical.damage.sustained),
            ("tactical.damage.aoe", &mut tactical.damage.aoe),
            ("tactical.damage.finishing", &mut tactical.damage.finishing),
            ("tactical.control.immobilize", &mut tactical.control.immobilize),
            ("tactical.control.zone", &mut tactical.control.zone),
            ("tactical.control.debuff", &mut tactical.control.debuff),
            ("tactical.control.denial", &mut tactical.control.denial),
            ("tactical.positioning.safety", &mut tactical.positioning.safety),
            ("tactical.positioning.threat", &mut tactical.positioning.threat),
            ("tactical.positioning.objective", &mut tactical.positioning.objective),
            ("tactical.positioning.support", &mut tactical.positioning.support),
            ("tactical.resources.energy", &mut tactical.resources.energy),
            ("tactical.resources.plasma", &mut tactical.resources.plasma),
            ("tactical.resources.endurance", &mut tactical.resources.endurance),
            ("strategic.team_comp.synergy", &mut strategic.team_comp.synergy),
            ("strategic.team_comp.coverage", &mut strategic.team_comp.coverage),
            ("strategic.team_comp.formation", &mut strategic.team_comp.formation),
            ("strategic.map_control.center", &mut strategic.map_control.center),
            ("strategic.map_control.zones", &mut strategic.map_control.zones),
            ("strategic.map_control.mobility", &mut strategic.map_control.mobility),
            ("strategic.resource_control.generation", &mut strategic.resource_control.generation),
            ("strategic.resource_control.denial", &mut strategic.resource_control.denial),
            ("strategic.resource_control.efficiency", &mut strategic.resource_control.efficiency),
            ("strategic.tempo.initiative", &mut strategic.tempo.initiative),
            ("strategic.tempo.pressure", &mut strategic.tempo.pressure),
            ("strategic.tempo.recovery", &mut strategic.tempo.recovery),
            ("situational.health.critical", &mut situational.health.critical),
            ("situational.health.healthy", &mut situational.health.healthy),
            ("situational.energy.low", &mut situational.energy.low),
            ("situational.energy.high", &mut situational.energy.high),
            ("situational.position.trapped", &mut situational.position.trapped),
            ("situational.position.dominant", &mut situational.position.dominant),
            ("situational.momentum.winning", &mut situational.momentum.winning),
            ("situational.momentum.losing", &mut situational.momentum.losing),
        ]
    }

    /// Every weight with its path, in table order
    pub fn leaves(&self) -> Vec<(&'static str, f32)> {
        let mut copy = *self;
        copy.leaves_mut().into_iter().map(|(path, v)| (path, *v)).collect()
    }

    pub fn get(&self, path: &str) -> Option<f32> {
        self.leaves()
            .into_iter()
            .find(|(p, _)| *p == path)
            .map(|(_, v)| v)
    }

    pub fn slot_mut(&mut self, path: &str) -> Option<&mut f32> {
        self.leaves_mut()
            .into_iter()
            .find(|(p, _)| *p == path)
            .map(|(_, v)| v)
    }

    /// Mean of the weights under `tier` ("tactical", "strategic" or
    /// "situational"); 0 for an unknown tier
    pub fn tier_mean(&self, tier: &str) -> f32 {
        let prefix = format!("{tier}.");
        let values: Vec<f32> = self
            .leaves()
            .into_iter()
            .filter(|(p, _)| p.starts_with(&prefix))
            .map(|(_, v)| v)
            .collect();
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f32>() / values.len() as f32
        }
    }
}

fn is_situational(path: &str) -> bool {
    path.starts_with("situational.")
}

/// Summary of how the current table leans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightAnalytics {
    pub tactical_balance: f32,
    pub strategic_balance: f32,
    /// Product of the situational modifiers last applied
    pub situational_impact: f32,
    pub active_modifiers: Vec<(String, f32)>,
}

/// Base and current weights, plus the situational modifiers in effect
#[derive(Debug, Clone)]
pub struct WeightSystem {
    base: DecisionWeights,
    current: DecisionWeights,
    situational_modifiers: BTreeMap<String, f32>,
    situational_ceiling: f32,
}

impl Default for WeightSystem {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl WeightSystem {
    pub fn new(situational_ceiling: f32) -> Self {
        let base = DecisionWeights::default();
        Self {
            base,
            current: base,
            situational_modifiers: BTreeMap::new(),
            situational_ceiling: situational_ceiling.max(1.0),
        }
    }

    pub fn base(&self) -> &DecisionWeights {
        &self.base
    }

    pub fn current(&self) -> &DecisionWeights {
        &self.current
    }

    fn bound(&self, path: &str, value: f32) -> f32 {
        let upper = if is_situational(path) {
            self.situational_ceiling
        } else {
            1.0
        };
        if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, upper)
        }
    }

    /// Set one weight, clamped to its tier's range; returns the stored value
    pub fn adjust(&mut self, path: &str, value: f32) -> Result<f32> {
        let bounded = self.bound(path, value);
        let slot = self
            .current
            .slot_mut(path)
            .ok_or_else(|| AnalyticsError::UnknownWeight(path.to_string()))?;
        *slot = bounded;
        Ok(bounded)
    }

    /// Multiply one weight in place; returns the stored value
    pub fn scale(&mut self, path: &str, factor: f32) -> Result<f32> {
        let value = self
            .get(path)
            .ok_or_else(|| AnalyticsError::UnknownWeight(path.to_string()))?;
        self.adjust(path, value * factor)
    }

    pub fn get(&self, path: &str) -> Option<f32> {
        self.current.get(path)
    }

    /// Back to base weights, dropping situational modifiers
    pub fn reset(&mut self) {
        self.current = self.base;
        self.situational_modifiers.clear();
    }

    /// Replace the current table if every weight is within range
    pub fn set_weights(&mut self, weights: DecisionWeights) -> Result<()> {
        if let Some((path, value)) = self.out_of_range(&weights) {
            return Err(AnalyticsError::InvalidConfig(format!(
                "weight {path} = {value} is out of range"
            )));
        }
        self.current = weights;
        Ok(())
    }

    fn out_of_range(&self, weights: &DecisionWeights) -> Option<(&'static str, f32)> {
        weights
            .leaves()
            .into_iter()
            .find(|(path, value)| value.is_nan() || self.bound(path, *value) != *value)
    }

    pub fn validate(&self) -> bool {
        match self.out_of_range(&self.current) {
            Some((path, value)) => {
                tracing::warn!(weight = path, value, "Invalid weight value");
                false
            }
            None => true,
        }
    }

    /// Multiplier from the unit's health and energy bands, using base
    /// situational weights; the applied modifiers are remembered
    pub fn situational_multiplier(&mut self, unit: &Unit) -> f32 {
        let modifiers = &self.base.situational;
        let health = unit.health_ratio();
        let energy = unit.energy_ratio();

        let health_mod = if health < 0.3 {
            Some(modifiers.health.critical)
        } else if health > 0.8 {
            Some(modifiers.health.healthy)
        } else {
            None
        };
        let energy_mod = if energy < 0.3 {
            Some(modifiers.energy.low)
        } else if energy > 0.8 {
            Some(modifiers.energy.high)
        } else {
            None
        };

        let mut multiplier = 1.0;
        for (key, modifier) in [("health", health_mod), ("energy", energy_mod)] {
            match modifier {
                Some(m) => {
                    multiplier *= m;
                    self.situational_modifiers.insert(key.to_string(), m);
                }
                None => {
                    self.situational_modifiers.remove(key);
                }
            }
        }
        multiplier
    }

    pub fn analytics(&self) -> WeightAnalytics {
        WeightAnalytics {
            tactical_balance: self.current.tier_mean("tactical"),
            strategic_balance: self.current.tier_mean("strategic"),
            situational_impact: self.situational_modifiers.values().product(),
            active_modifiers: self
                .situational_modifiers
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::hex::HexCoord;

    #[test]
    fn test_base_weights() {
        let weights = DecisionWeights::default();
        assert_eq!(weights.get("tactical.damage.burst"), Some(0.7));
        assert_eq!(weights.get("strategic.tempo.initiative"), Some(0.7));
        assert_eq!(weights.get("situational.health.critical"), Some(1.5));
        assert_eq!(weights.get("tactical.damage"), None);
        assert_eq!(weights.leaves().len(), 35);
    }

    #[test]
    fn test_adjust_clamps_per_tier() {
        let mut system = WeightSystem::default();
        assert_eq!(system.adjust("tactical.damage.burst", 1.4).unwrap(), 1.0);
        assert_eq!(system.adjust("tactical.damage.burst", -0.3).unwrap(), 0.0);
        assert_eq!(system.adjust("situational.position.trapped", 2.2).unwrap(), 2.2);
        assert_eq!(system.adjust("situational.position.trapped", 9.0).unwrap(), 3.0);
        assert!(system.validate());
    }

    #[test]
    fn test_unknown_path_is_error() {
        let mut system = WeightSystem::default();
        let err = system.adjust("tactical.damage.splash", 0.5).unwrap_err();
        assert!(matches!(err, AnalyticsError::UnknownWeight(_)));
    }

    #[test]
    fn test_scale_compounds_until_reset() {
        let mut system = WeightSystem::default();
        system.scale("strategic.map_control.center", 1.2).unwrap();
        system.scale("strategic.map_control.center", 1.1).unwrap();
        let value = system.get("strategic.map_control.center").unwrap();
        assert!((value - 0.924).abs() < 1e-5);

        system.reset();
        assert_eq!(system.current(), system.base());
    }

    #[test]
    fn test_set_weights_rejects_out_of_range() {
        let mut system = WeightSystem::default();
        let mut weights = DecisionWeights::default();
        weights.tactical.control.zone = 1.5;
        assert!(system.set_weights(weights).is_err());
        assert_eq!(system.get("tactical.control.zone"), Some(0.7));

        weights.tactical.control.zone = 0.9;
        system.set_weights(weights).unwrap();
        assert_eq!(system.get("tactical.control.zone"), Some(0.9));
    }

    #[test]
    fn test_category_balance() {
        let analytics = WeightSystem::default().analytics();
        assert!((analytics.tactical_balance - 9.2 / 15.0).abs() < 1e-5);
        assert!((analytics.strategic_balance - 7.1 / 12.0).abs() < 1e-5);
        assert_eq!(analytics.situational_impact, 1.0);
        assert!(analytics.active_modifiers.is_empty());
    }

    #[test]
    fn test_situational_multiplier_bands() {
        let mut system = WeightSystem::default();
        let mut unit = Unit::new(1, "Scout", 0, HexCoord::new(0, 0));
        assert!((system.situational_multiplier(&unit) - 0.72).abs() < 1e-6);

        unit.health = unit.stats.health * 0.2;
        unit.energy = unit.stats.energy * 0.5;
        assert!((system.situational_multiplier(&unit) - 1.5).abs() < 1e-6);

        let analytics = system.analytics();
        assert_eq!(analytics.active_modifiers, vec![("health".to_string(), 1.5)]);
    }
}
