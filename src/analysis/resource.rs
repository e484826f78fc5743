//! Resource dimension: energy, plasma and endurance management
//!
//! The analyzer keeps a short per-unit history of resource samples; every
//! analysis appends one.

use std::collections::VecDeque;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::board::unit::Unit;
use crate::board::view::GameView;
use crate::core::types::{clamp01, Timestamp, UnitId};

/// Turns covered by the forecast
pub const FORECAST_TURNS: f32 = 3.0;
/// Plasma a team is assumed to gain per turn
pub const PLASMA_PER_TURN: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyEfficiency {
    pub usage: f32,
    pub regeneration: f32,
    pub waste: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlasmaEfficiency {
    pub usage: f32,
    /// Team plasma over all plasma on the board
    pub team_share: f32,
    /// -1 to 1
    pub advantage: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnduranceEfficiency {
    pub usage: f32,
    pub recovery: f32,
    pub risk: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceEfficiency {
    pub energy: EnergyEfficiency,
    pub plasma: PlasmaEfficiency,
    pub endurance: EnduranceEfficiency,
}

impl ResourceEfficiency {
    /// Single 0-1 figure fed to the weight feedback loop
    pub fn overall(&self) -> f32 {
        clamp01(0.4 * self.energy.usage + 0.3 * self.endurance.usage + 0.3 * self.plasma.usage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceTiming {
    pub energy: f32,
    pub plasma: f32,
    pub endurance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceForecast {
    pub energy: f32,
    pub plasma: f32,
    pub fatigue: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSuggestions {
    pub immediate: Vec<String>,
    pub strategic: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAnalysis {
    pub efficiency: ResourceEfficiency,
    pub timing: ResourceTiming,
    pub forecast: ResourceForecast,
    pub suggestions: ResourceSuggestions,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub timestamp: Timestamp,
    pub energy: f32,
    pub plasma: f32,
    pub endurance: f32,
}

/// Energy ratio, cut 20% per unused ability the unit cannot pay for, with a
/// 20% bonus inside the 0.3-0.7 band
pub fn energy_usage(unit: &Unit) -> f32 {
    let ratio = unit.energy_ratio();
    let unaffordable = unit
        .unused_abilities()
        .filter(|a| a.costs.energy > 0.0 && a.costs.energy > unit.energy)
        .count();
    let mut usage = ratio * 0.8_f32.powi(unaffordable as i32);
    if (0.3..=0.7).contains(&ratio) {
        usage *= 1.2;
    }
    usage.min(1.0)
}

/// 1 for units without plasma abilities, else available over still-needed plasma
pub fn plasma_usage(unit: &Unit, team_plasma: f32) -> f32 {
    if !unit.abilities.iter().any(|a| a.costs.plasma > 0.0) {
        return 1.0;
    }
    let needed: f32 = unit
        .unused_abilities()
        .map(|a| a.costs.plasma)
        .filter(|p| *p > 0.0)
        .sum();
    let needed = if needed > 0.0 { needed } else { 1.0 };
    (team_plasma / needed).min(1.0)
}

pub fn plasma_advantage(team: f32, enemy: f32) -> f32 {
    let total = team + enemy;
    if total > 0.0 {
        (team - enemy) / total
    } else {
        0.0
    }
}

pub fn fatigue_risk(unit: &Unit) -> f32 {
    if unit.protected_from_fatigue {
        return 0.0;
    }
    let mut risk = 1.0 - unit.endurance_ratio();
    if unit.energy_ratio() < 0.3 {
        risk += 0.2;
    }
    risk += unit.used_abilities().count() as f32 * 0.1;
    clamp01(risk)
}

pub fn predict_fatigue(unit: &Unit) -> bool {
    if unit.protected_from_fatigue {
        return false;
    }
    let ratio = unit.endurance_ratio();
    ratio < 0.3 || (ratio < 0.5 && unit.used_abilities().count() > 1)
}

fn energy_timing(unit: &Unit) -> f32 {
    let ratio = unit.energy_ratio();
    if !(0.2..=0.8).contains(&ratio) {
        0.5
    } else if (0.3..=0.7).contains(&ratio) {
        1.0
    } else {
        0.75
    }
}

fn plasma_timing(unit: &Unit, team_plasma: f32) -> f32 {
    let affordable = unit
        .unused_abilities()
        .any(|a| a.costs.plasma > 0.0 && a.costs.plasma <= team_plasma);
    if affordable {
        1.0
    } else {
        0.5
    }
}

fn endurance_timing(unit: &Unit) -> f32 {
    if unit.protected_from_fatigue {
        return 1.0;
    }
    let ratio = unit.endurance_ratio();
    if ratio < 0.3 {
        0.2
    } else if ratio > 0.7 {
        1.0
    } else {
        0.6
    }
}

fn suggestions(efficiency: &ResourceEfficiency, forecast: &ResourceForecast) -> ResourceSuggestions {
    let mut out = ResourceSuggestions::default();
    if efficiency.energy.usage < 0.5 {
        out.immediate.push("Conserve energy for critical abilities".into());
    }
    if efficiency.energy.waste > 0.2 {
        out.immediate.push("Use abilities to avoid wasting energy".into());
    }
    if efficiency.plasma.advantage < -0.3 {
        out.strategic.push("Build plasma advantage before engaging".into());
    }
    if efficiency.plasma.team_share > 0.6 {
        out.strategic.push("Share plasma with team for better efficiency".into());
    }
    if efficiency.endurance.risk > 0.7 {
        out.immediate.push("Avoid actions to prevent fatigue".into());
    }
    if forecast.fatigue {
        out.strategic.push("Plan for recovery from predicted fatigue".into());
    }
    out
}

/// Resource analyzer with a bounded per-unit sample history
#[derive(Debug)]
pub struct ResourceAnalyzer {
    history: AHashMap<UnitId, VecDeque<ResourceSample>>,
    history_len: usize,
}

impl ResourceAnalyzer {
    pub fn new(history_len: usize) -> Self {
        Self {
            history: AHashMap::new(),
            history_len: history_len.max(1),
        }
    }

    /// Analyze `unit`'s resources and record a sample
    ///
    /// Scores cover the unit's whole kit rather than a single ability.
    pub fn analyze<V: GameView + ?Sized>(
        &mut self,
        view: &V,
        unit: &Unit,
        timestamp: Timestamp,
    ) -> ResourceAnalysis {
        let team_plasma = view.team_plasma(unit.team);
        let enemy_plasma = view.enemy_plasma(unit.team);
        let total_plasma = team_plasma + enemy_plasma;

        let endurance_ratio = unit.endurance_ratio();
        let efficiency = ResourceEfficiency {
            energy: EnergyEfficiency {
                usage: energy_usage(unit),
                regeneration: unit.stats.meditation / 10.0,
                waste: (unit.energy_ratio() - 0.8).max(0.0),
            },
            plasma: PlasmaEfficiency {
                usage: plasma_usage(unit, team_plasma),
                team_share: if total_plasma > 0.0 {
                    team_plasma / total_plasma
                } else {
                    0.0
                },
                advantage: plasma_advantage(team_plasma, enemy_plasma),
            },
            endurance: EnduranceEfficiency {
                usage: endurance_ratio,
                recovery: if unit.protected_from_fatigue {
                    1.0
                } else {
                    endurance_ratio
                },
                risk: fatigue_risk(unit),
            },
        };

        let timing = ResourceTiming {
            energy: energy_timing(unit),
            plasma: plasma_timing(unit, team_plasma),
            endurance: endurance_timing(unit),
        };

        let forecast = ResourceForecast {
            energy: unit
                .stats
                .energy
                .min(unit.energy + unit.stats.meditation * FORECAST_TURNS),
            plasma: team_plasma + PLASMA_PER_TURN * FORECAST_TURNS,
            fatigue: predict_fatigue(unit),
        };

        self.record(
            unit.id,
            ResourceSample {
                timestamp,
                energy: unit.energy,
                plasma: team_plasma,
                endurance: unit.endurance,
            },
        );

        let suggestions = suggestions(&efficiency, &forecast);
        tracing::trace!(
            unit = %unit.id,
            energy = efficiency.energy.usage,
            risk = efficiency.endurance.risk,
            "Resource analysis"
        );

        ResourceAnalysis {
            efficiency,
            timing,
            forecast,
            suggestions,
        }
    }

    fn record(&mut self, id: UnitId, sample: ResourceSample) {
        let samples = self.history.entry(id).or_default();
        samples.push_back(sample);
        while samples.len() > self.history_len {
            samples.pop_front();
        }
    }

    pub fn history(&self, id: UnitId) -> impl Iterator<Item = &ResourceSample> {
        self.history.get(&id).into_iter().flatten()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl Default for ResourceAnalyzer {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ability::Ability;
    use crate::board::battlefield::Battlefield;
    use crate::board::hex::HexCoord;
    use crate::core::types::TeamId;

    fn field_with(unit: Unit) -> Battlefield {
        let mut field = Battlefield::new(6, 6);
        field.add_unit(unit).unwrap();
        field
    }

    #[test]
    fn test_energy_usage_band_bonus() {
        let mut unit = Unit::new(1, "Mage", 0, HexCoord::new(0, 0));
        unit.energy = 50.0;
        assert!((energy_usage(&unit) - 0.6).abs() < 1e-6);
        unit.energy = 90.0;
        assert!((energy_usage(&unit) - 0.9).abs() < 1e-6);
        unit.energy = 100.0;
        assert_eq!(energy_usage(&unit), 1.0);
    }

    #[test]
    fn test_energy_usage_penalty_per_unaffordable_ability() {
        let mut unit = Unit::new(1, "Mage", 0, HexCoord::new(0, 0))
            .with_ability(Ability::new("Nova").with_costs(95.0, 0.0))
            .with_ability(Ability::new("Storm").with_costs(99.0, 0.0));
        unit.energy = 90.0;
        assert!((energy_usage(&unit) - 0.9 * 0.64).abs() < 1e-5);
    }

    #[test]
    fn test_plasma_usage() {
        let plain = Unit::new(1, "Grunt", 0, HexCoord::new(0, 0));
        assert_eq!(plasma_usage(&plain, 0.0), 1.0);

        let caster = Unit::new(2, "Priest", 0, HexCoord::new(0, 0))
            .with_ability(Ability::new("Gate").with_costs(0.0, 4.0));
        assert_eq!(plasma_usage(&caster, 2.0), 0.5);
        assert_eq!(plasma_usage(&caster, 8.0), 1.0);
    }

    #[test]
    fn test_plasma_advantage() {
        assert_eq!(plasma_advantage(0.0, 0.0), 0.0);
        assert_eq!(plasma_advantage(3.0, 1.0), 0.5);
        assert_eq!(plasma_advantage(0.0, 4.0), -1.0);
    }

    #[test]
    fn test_fatigue_risk_and_protection() {
        let mut unit = Unit::new(1, "Grunt", 0, HexCoord::new(0, 0))
            .with_ability(Ability::new("Hit"))
            .with_ability(Ability::new("Kick"));
        unit.endurance = 10.0;
        unit.abilities[0].used = true;
        unit.abilities[1].used = true;
        assert!((fatigue_risk(&unit) - 1.0).abs() < 1e-6);
        assert!(predict_fatigue(&unit));

        unit.protected_from_fatigue = true;
        assert_eq!(fatigue_risk(&unit), 0.0);
        assert!(!predict_fatigue(&unit));
    }

    #[test]
    fn test_analysis_suggestions() {
        let mut unit = Unit::new(1, "Grunt", 0, HexCoord::new(0, 0));
        unit.energy = 10.0;
        unit.endurance = 5.0;
        let mut field = field_with(unit);
        field.add_unit(Unit::new(2, "Foe", 1, HexCoord::new(5, 5))).unwrap();
        field.set_plasma(TeamId(1), 5.0);

        let mut analyzer = ResourceAnalyzer::default();
        let unit = field.unit(UnitId(1)).unwrap();
        let analysis = analyzer.analyze(&field, unit, 7);

        assert!(analysis
            .suggestions
            .immediate
            .contains(&"Conserve energy for critical abilities".to_string()));
        assert!(analysis
            .suggestions
            .immediate
            .contains(&"Avoid actions to prevent fatigue".to_string()));
        assert!(analysis
            .suggestions
            .strategic
            .contains(&"Build plasma advantage before engaging".to_string()));
        assert_eq!(analysis.forecast.energy, 40.0);
        assert_eq!(analysis.forecast.plasma, 3.0);
        assert_eq!(analysis.timing.energy, 0.5);
        assert_eq!(analysis.timing.endurance, 0.2);
    }

    #[test]
    fn test_history_is_bounded() {
        let field = field_with(Unit::new(1, "Grunt", 0, HexCoord::new(0, 0)));
        let mut analyzer = ResourceAnalyzer::new(3);
        let unit = field.unit(UnitId(1)).unwrap();
        for t in 0..5 {
            analyzer.analyze(&field, unit, t);
        }
        let stamps: Vec<Timestamp> = analyzer.history(UnitId(1)).map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![2, 3, 4]);
    }

    #[test]
    fn test_overall_efficiency_weights() {
        let field = field_with(Unit::new(1, "Grunt", 0, HexCoord::new(0, 0)));
        let mut analyzer = ResourceAnalyzer::default();
        let unit = field.unit(UnitId(1)).unwrap();
        let analysis = analyzer.analyze(&field, unit, 0);
        assert!((analysis.efficiency.overall() - 1.0).abs() < 1e-6);
    }
}
