//! Threat composer
//!
//! Folds the ability, position, unit-state and control-severity readings for
//! one (source, ability, target) triple into a single 0-1 threat level.

use serde::{Deserialize, Serialize};

use crate::analysis::ability::{analyze_ability, OffensiveImpact};
use crate::analysis::control::{classify_severity, estimate_duration, ControlSeverity, EscalationFactors};
use crate::analysis::position::{
    check_team_synergies, will_block_escape_routes, will_force_movement, will_trap_target, Placement,
};
use crate::analysis::unit_state::UnitStateSnapshot;
use crate::board::ability::Ability;
use crate::board::effects::EffectKeywords;
use crate::board::hex::HexCoord;
use crate::board::unit::Unit;
use crate::board::view::GameView;
use crate::core::types::{clamp01, UnitId};

pub const DAMAGE_WEIGHT: f32 = 0.4;
pub const CONTROL_WEIGHT: f32 = 0.3;
pub const POSITION_WEIGHT: f32 = 0.2;
pub const RESOURCE_WEIGHT: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatType {
    Damage,
    Control,
    Debuff,
    Zone,
    Positioning,
    Resource,
    Combo,
}

/// The four weighted inputs of the threat level, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThreatComponents {
    pub damage: f32,
    pub control: f32,
    pub position: f32,
    pub resource: f32,
}

impl ThreatComponents {
    pub fn threat_level(&self) -> f32 {
        clamp01(
            DAMAGE_WEIGHT * self.damage
                + CONTROL_WEIGHT * self.control
                + POSITION_WEIGHT * self.position
                + RESOURCE_WEIGHT * self.resource,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatDetails {
    pub damage_estimate: f32,
    pub control_duration: u32,
    pub severity: Option<ControlSeverity>,
    pub effects: Vec<String>,
    pub escape_routes: u32,
    pub will_block: bool,
    pub will_trap: bool,
    pub will_force_move: bool,
    pub has_synergy: bool,
    /// Estimated damage is at least the target's current health
    pub will_kill: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub source_id: UnitId,
    pub target_id: UnitId,
    pub ability: String,
    /// In [0, 1]
    pub threat_level: f32,
    pub threat_type: ThreatType,
    pub range: u32,
    /// Where the source stands
    pub position: HexCoord,
    pub components: ThreatComponents,
    pub details: ThreatDetails,
}

fn classify_type(
    components: &ThreatComponents,
    duration: u32,
    impact: &OffensiveImpact,
    ability: &Ability,
) -> ThreatType {
    match (components.damage > 0.0, duration > 0) {
        (true, true) => ThreatType::Combo,
        (true, false) => ThreatType::Damage,
        (false, true) => ThreatType::Control,
        (false, false) if impact.zone_control > 0 => ThreatType::Zone,
        (false, false) if will_force_movement(ability) => ThreatType::Positioning,
        (false, false) if ability.keywords().contains(EffectKeywords::DRAIN) => ThreatType::Resource,
        (false, false) => ThreatType::Debuff,
    }
}

/// Threat `source` poses to `target` by using `ability`
pub fn assess<V: GameView + ?Sized>(
    view: &V,
    source: &Unit,
    ability: &Ability,
    target: &Unit,
) -> ThreatAssessment {
    let result = analyze_ability(view, ability, Some(target));
    let state = UnitStateSnapshot::capture(target);

    let severity = result.control_context.as_ref().and_then(|ctx| {
        classify_severity(result.control_effects, &EscalationFactors::from_context(ctx))
    });
    let duration = estimate_duration(result.control_effects);

    let escape_routes = Placement::current(view, target).escape_routes() as u32;
    let will_block = will_block_escape_routes(view, source, target, ability);
    let will_trap = will_trap_target(view, target, ability);
    let will_force_move = will_force_movement(ability);

    let max_health = target.stats.health;
    let components = ThreatComponents {
        damage: if max_health > 0.0 {
            (result.damage / max_health).min(1.0)
        } else {
            0.0
        },
        control: severity.map_or(0.0, |s| s.fraction()),
        position: if will_trap || will_block || (escape_routes <= 1 && will_force_move) {
            1.0
        } else {
            0.0
        },
        resource: if state.is_resource_pressured() { 1.0 } else { 0.0 },
    };

    let impact = OffensiveImpact::of(ability);
    let threat_type = classify_type(&components, duration, &impact, ability);

    ThreatAssessment {
        source_id: source.id,
        target_id: target.id,
        ability: ability.title.clone(),
        threat_level: components.threat_level(),
        threat_type,
        range: result.range,
        position: source.position,
        components,
        details: ThreatDetails {
            damage_estimate: result.damage,
            control_duration: duration,
            severity,
            effects: ability.effects.clone(),
            escape_routes,
            will_block,
            will_trap,
            will_force_move,
            has_synergy: check_team_synergies(view, source, ability),
            will_kill: result.damage > 0.0 && result.damage >= target.health,
        },
    }
}

/// Enemy units and unused abilities that could reach `target` this turn
pub fn threat_candidates<'a, V: GameView + ?Sized>(view: &'a V, target: &Unit) -> Vec<(&'a Unit, &'a Ability)> {
    view.living_units()
        .into_iter()
        .filter(|u| u.team != target.team)
        .flat_map(|enemy| {
            let reach = enemy.distance_to(target);
            enemy
                .unused_abilities()
                .filter(move |a| reach <= a.effective_range() + enemy.stats.movement)
                .map(move |a| (enemy, a))
        })
        .collect()
}

/// Most dangerous first, shorter reach breaking ties
pub fn prioritize(threats: &mut [ThreatAssessment]) {
    threats.sort_by(|a, b| {
        b.threat_level
            .total_cmp(&a.threat_level)
            .then(a.range.cmp(&b.range))
    });
}

/// Every unused enemy ability that could reach `target` this turn, most
/// dangerous first
pub fn assess_threats_to<V: GameView + ?Sized>(view: &V, target: &Unit) -> Vec<ThreatAssessment> {
    let mut threats: Vec<ThreatAssessment> = threat_candidates(view, target)
        .into_iter()
        .map(|(enemy, ability)| assess(view, enemy, ability, target))
        .collect();
    prioritize(&mut threats);
    threats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ability::DamageValue;
    use crate::board::battlefield::Battlefield;

    fn duel(ability: Ability) -> Battlefield {
        let mut field = Battlefield::new(9, 9);
        field
            .add_unit(Unit::new(1, "Hunter", 0, HexCoord::new(3, 4)).with_ability(ability))
            .unwrap();
        field.add_unit(Unit::new(2, "Prey", 1, HexCoord::new(4, 4))).unwrap();
        field
    }

    fn assess_first(field: &Battlefield) -> ThreatAssessment {
        let source = field.unit(UnitId(1)).unwrap();
        let target = field.unit(UnitId(2)).unwrap();
        assess(field, source, &source.abilities[0], target)
    }

    #[test]
    fn test_pure_damage_threat() {
        let field = duel(
            Ability::new("Volley")
                .with_damage("pierce", DamageValue::Flat(12.0))
                .with_damage("crush", DamageValue::Flat(10.0)),
        );
        let threat = assess_first(&field);
        assert!((threat.components.damage - 0.22).abs() < 1e-6);
        assert_eq!(threat.threat_type, ThreatType::Damage);
        assert_eq!(threat.components.control, 0.0);
        assert!((threat.threat_level - 0.088).abs() < 1e-6);
        assert!(!threat.details.will_kill);
    }

    #[test]
    fn test_combo_threat() {
        let field = duel(
            Ability::new("Ice Lance")
                .with_damage("frost", DamageValue::Flat(30.0))
                .with_effect("Target is frozen"),
        );
        let threat = assess_first(&field);
        assert_eq!(threat.threat_type, ThreatType::Combo);
        assert_eq!(threat.details.severity, Some(ControlSeverity::Critical));
        assert_eq!(threat.components.control, 1.0);
        assert_eq!(threat.details.control_duration, 2);
    }

    #[test]
    fn test_non_damage_types() {
        let zone = assess_first(&duel(Ability::new("Wall").with_range(2, None).with_effect("Raise a wall")));
        assert_eq!(zone.threat_type, ThreatType::Zone);

        let push = assess_first(&duel(Ability::new("Shove").with_effect("Push the target")));
        assert_eq!(push.threat_type, ThreatType::Positioning);

        let drain = assess_first(&duel(Ability::new("Leech").with_effect("Drain energy")));
        assert_eq!(drain.threat_type, ThreatType::Resource);

        let other = assess_first(&duel(Ability::new("Taunt").with_effect("Looks menacing")));
        assert_eq!(other.threat_type, ThreatType::Debuff);
        assert_eq!(other.threat_level, 0.0);
    }

    #[test]
    fn test_resource_component_and_kill() {
        let mut field = duel(Ability::new("Finisher").with_damage("slash", DamageValue::Flat(35.0)));
        field.unit_mut(UnitId(2)).unwrap().health = 30.0;
        let threat = assess_first(&field);
        assert_eq!(threat.components.resource, 1.0);
        assert!(threat.details.will_kill);
    }

    #[test]
    fn test_threats_to_sorted() {
        let hunter = Unit::new(1, "Hunter", 0, HexCoord::new(3, 4))
            .with_ability(Ability::new("Poke").with_damage("pierce", DamageValue::Flat(5.0)))
            .with_ability(Ability::new("Smash").with_damage("crush", DamageValue::Flat(50.0)));
        let mut field = Battlefield::new(9, 9);
        field.add_unit(hunter).unwrap();
        field.add_unit(Unit::new(2, "Prey", 1, HexCoord::new(4, 4))).unwrap();

        let target = field.unit(UnitId(2)).unwrap();
        let threats = assess_threats_to(&field, target);
        assert_eq!(threats.len(), 2);
        assert_eq!(threats[0].ability, "Smash");
        assert!(threats[0].threat_level >= threats[1].threat_level);
    }
}
