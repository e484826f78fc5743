//! Ability dimension
//!
//! Extracts damage and control from an ability, scores the targets it could
//! be aimed at and looks for follow-up combos on the caster and its allies.

use serde::{Deserialize, Serialize};

use crate::analysis::context::ControlContext;
use crate::analysis::position::THREAT_RADIUS;
use crate::board::ability::{Ability, TargetTeam};
use crate::board::effects::{ControlFlags, EffectKeywords};
use crate::board::hex::HexCoord;
use crate::board::unit::Unit;
use crate::board::view::GameView;
use crate::core::types::UnitId;

/// Unit brought onto the board by a summoning ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonedUnit {
    pub id: UnitId,
    pub unit_type: String,
    pub position: HexCoord,
}

/// Offensive impact of one ability use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityThreatResult {
    pub damage: f32,
    pub control_effects: ControlFlags,
    /// Always at least 1
    pub range: u32,
    /// Always at least 1
    pub hexes_affected: u32,
    /// Present only when control effects are set and a target is known
    pub control_context: Option<ControlContext>,
    pub summoned_unit: Option<SummonedUnit>,
}

impl AbilityThreatResult {
    /// Single-target, melee-range impact carrying only damage
    pub fn basic(damage: f32) -> Self {
        Self {
            damage,
            control_effects: ControlFlags::empty(),
            range: 1,
            hexes_affected: 1,
            control_context: None,
            summoned_unit: None,
        }
    }

    pub fn has_control(&self) -> bool {
        !self.control_effects.is_empty()
    }

    pub fn control_count(&self) -> u32 {
        self.control_effects.bits().count_ones()
    }
}

/// Damage, control, reach and area of `ability`, optionally aimed at `target`
pub fn analyze_ability<V: GameView + ?Sized>(
    view: &V,
    ability: &Ability,
    target: Option<&Unit>,
) -> AbilityThreatResult {
    let control = ability.control();
    let control_context = match target {
        Some(t) if !control.is_empty() => Some(ControlContext::build(view, t, control)),
        _ => None,
    };

    AbilityThreatResult {
        damage: ability.total_damage(),
        control_effects: control,
        range: ability.effective_range(),
        hexes_affected: ability.hexes_affected(),
        control_context,
        summoned_unit: None,
    }
}

/// Does `second` capitalize on the setup `first` creates?
pub fn abilities_combo(first: &Ability, second: &Ability) -> bool {
    let setup = first
        .keywords()
        .intersects(EffectKeywords::AMPLIFY | EffectKeywords::SETUP);
    let follow_up = second.has_damage()
        || second
            .keywords()
            .intersects(EffectKeywords::FINISHER | EffectKeywords::CHAIN);
    setup && follow_up
}

/// Kind of synergy between two combining abilities
pub fn describe_synergy(first: &Ability, second: &Ability) -> &'static str {
    let kw = first.keywords();
    if kw.contains(EffectKeywords::AMPLIFY) && second.has_damage() {
        "Damage amplification"
    } else if first.control().intersects(ControlFlags::TRAP | ControlFlags::IMMOBILIZE)
        && second.keywords().contains(EffectKeywords::FINISHER)
    {
        "Control chain"
    } else if first.costs.energy + second.costs.energy > 10.0 {
        "Resource pressure"
    } else if kw.contains(EffectKeywords::REPOSITION) && second.has_damage() {
        "Positional advantage"
    } else {
        "General combo"
    }
}

fn suggest_timing(ability: &Ability) -> &'static str {
    if ability.costs.energy > 5.0 {
        "When energy available"
    } else if ability.keywords().contains(EffectKeywords::COUNTER) {
        "Save for counter"
    } else {
        "Use when ready"
    }
}

/// Longest duration, in turns, of the control the ability imposes
fn control_duration(ability: &Ability) -> u32 {
    let control = ability.control();
    if control.intersects(ControlFlags::FROZEN | ControlFlags::CRYOSTASIS) {
        3
    } else if control.intersects(ControlFlags::TRAP | ControlFlags::IMMOBILIZE) {
        2
    } else if control.intersects(ControlFlags::DIZZY | ControlFlags::DELAYED) {
        1
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffensiveImpact {
    pub damage_types: Vec<String>,
    pub control_effects: Vec<String>,
    pub area_coverage: u32,
    /// Type-weighted numeric damage over 100; 1.0 kills a typical unit
    pub predicted_value: f32,
    pub control_duration: u32,
    pub zone_control: u32,
}

impl OffensiveImpact {
    pub fn of(ability: &Ability) -> Self {
        let reach = ability.max_range();
        let effects = ability.effects.len() as u32;
        let zone_control = if ability.keywords().contains(EffectKeywords::ZONE) {
            reach * effects
        } else {
            0
        };
        Self {
            damage_types: ability.damages.keys().cloned().collect(),
            control_effects: ability.effects.clone(),
            area_coverage: reach * effects,
            predicted_value: ability.weighted_damage() / 100.0,
            control_duration: control_duration(ability),
            zone_control,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetChoice {
    pub unit_id: UnitId,
    pub name: String,
    pub score: f32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerableTarget {
    pub unit_id: UnitId,
    pub name: String,
    pub vulnerability: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAnalysis {
    pub valid_targets: Vec<UnitId>,
    /// Best three by score
    pub optimal_targets: Vec<TargetChoice>,
    pub vulnerable_targets: Vec<VulnerableTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub ability: String,
    pub synergy: String,
    pub timing: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamCombo {
    pub ally: UnitId,
    pub ally_name: String,
    pub ability: String,
    pub synergy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboPotential {
    pub follow_ups: Vec<FollowUp>,
    pub team_combos: Vec<TeamCombo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicContext {
    pub team_position: String,
    pub resource_state: String,
    pub threat_context: String,
    pub combo_potential: ComboPotential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityUsageAnalysis {
    pub offensive_impact: OffensiveImpact,
    pub target_analysis: TargetAnalysis,
    pub strategic_context: StrategicContext,
}

/// Full usage analysis of `ability` in the hands of `source`
pub fn analyze_usage<V: GameView + ?Sized>(
    view: &V,
    source: &Unit,
    ability: &Ability,
) -> AbilityUsageAnalysis {
    AbilityUsageAnalysis {
        offensive_impact: OffensiveImpact::of(ability),
        target_analysis: analyze_targets(view, source, ability),
        strategic_context: StrategicContext {
            team_position: team_position(view, source).to_string(),
            resource_state: resource_state(view, source, ability).to_string(),
            threat_context: threat_context(view, source),
            combo_potential: combo_potential(view, source, ability),
        },
    }
}

fn is_valid_target(source: &Unit, target: &Unit, ability: &Ability) -> bool {
    if !target.alive || target.id == source.id {
        return false;
    }
    let team_ok = match ability.target_team {
        TargetTeam::Enemy => target.team != source.team,
        TargetTeam::Ally => target.team == source.team,
        TargetTeam::Any => true,
    };
    team_ok && source.distance_to(target) <= ability.effective_range()
}

/// Every living unit `source` could aim `ability` at
pub fn valid_targets<'a, V: GameView + ?Sized>(
    view: &'a V,
    source: &Unit,
    ability: &Ability,
) -> Vec<&'a Unit> {
    view.units()
        .iter()
        .filter(|t| is_valid_target(source, t, ability))
        .collect()
}

fn has_synergy(target: &Unit, ability: &Ability) -> bool {
    let status = target.status().keywords;
    if ability.has_damage() {
        status.contains(EffectKeywords::AMPLIFY)
    } else if ability.keywords().contains(EffectKeywords::CONTROL_WORD) {
        status.contains(EffectKeywords::SLOWED)
    } else {
        false
    }
}

fn is_isolated<V: GameView + ?Sized>(view: &V, target: &Unit) -> bool {
    !view
        .living_units()
        .iter()
        .any(|u| u.id != target.id && u.team == target.team && target.distance_to(u) <= 2)
}

fn target_score<V: GameView + ?Sized>(view: &V, target: &Unit, ability: &Ability) -> f32 {
    let mut score = (1.0 - target.health_ratio()) * 0.3;
    if target.energy_ratio() < 0.3 {
        score += 0.2;
    }
    let extent = view.width().max(view.height()).max(1) as f32;
    score += view.center().distance(&target.position) as f32 / extent * 0.2;
    if has_synergy(target, ability) {
        score += 0.3;
    }
    score.min(1.0)
}

fn targeting_reason<V: GameView + ?Sized>(view: &V, target: &Unit, ability: &Ability) -> &'static str {
    if target.health_ratio() < 0.3 {
        "Low health target"
    } else if target.energy_ratio() < 0.3 {
        "Low energy target"
    } else if is_isolated(view, target) {
        "Positionally vulnerable"
    } else if has_synergy(target, ability) {
        "Good ability synergy"
    } else {
        "General target"
    }
}

fn vulnerability<V: GameView + ?Sized>(view: &V, target: &Unit, ability: &Ability) -> Option<&'static str> {
    if target.health_ratio() < 0.3 {
        Some("Critical health")
    } else if target.is_fatigued() {
        Some("Fatigued")
    } else if ability.costs.energy > 0.0 && target.energy < ability.costs.energy {
        Some("Cannot counter")
    } else if is_isolated(view, target) {
        Some("Poor positioning")
    } else {
        None
    }
}

fn analyze_targets<V: GameView + ?Sized>(view: &V, source: &Unit, ability: &Ability) -> TargetAnalysis {
    let targets = valid_targets(view, source, ability);

    let mut optimal: Vec<TargetChoice> = targets
        .iter()
        .map(|t| TargetChoice {
            unit_id: t.id,
            name: t.name.clone(),
            score: target_score(view, t, ability),
            reason: targeting_reason(view, t, ability).to_string(),
        })
        .collect();
    optimal.sort_by(|a, b| b.score.total_cmp(&a.score));
    optimal.truncate(3);

    let vulnerable_targets = targets
        .iter()
        .filter_map(|t| {
            vulnerability(view, t, ability).map(|v| VulnerableTarget {
                unit_id: t.id,
                name: t.name.clone(),
                vulnerability: v.to_string(),
            })
        })
        .collect();

    TargetAnalysis {
        valid_targets: targets.iter().map(|t| t.id).collect(),
        optimal_targets: optimal,
        vulnerable_targets,
    }
}

fn team_position<V: GameView + ?Sized>(view: &V, source: &Unit) -> &'static str {
    let living = view.living_units();
    let allies = living
        .iter()
        .filter(|u| u.id != source.id && u.team == source.team)
        .count();
    let enemies = living.iter().filter(|u| u.team != source.team).count();
    match allies.cmp(&enemies) {
        std::cmp::Ordering::Greater => "Numerical advantage",
        std::cmp::Ordering::Less => "Numerical disadvantage",
        std::cmp::Ordering::Equal => "Even numbers",
    }
}

fn resource_state<V: GameView + ?Sized>(view: &V, source: &Unit, ability: &Ability) -> &'static str {
    let energy = source.energy_ratio();
    if energy < 0.3 {
        "Critical energy"
    } else if energy < 0.5 {
        "Low energy"
    } else if ability.costs.energy > source.energy {
        "Insufficient energy"
    } else if ability.costs.plasma > view.team_plasma(source.team) {
        "Insufficient plasma"
    } else {
        "Resources available"
    }
}

fn threat_context<V: GameView + ?Sized>(view: &V, source: &Unit) -> String {
    let threats = view
        .living_units()
        .iter()
        .filter(|u| u.team != source.team && source.distance_to(u) <= THREAT_RADIUS)
        .count();
    match threats {
        0 => "No immediate threats".to_string(),
        1 => "Single threat nearby".to_string(),
        n => format!("Multiple threats ({n})"),
    }
}

fn combo_potential<V: GameView + ?Sized>(view: &V, source: &Unit, ability: &Ability) -> ComboPotential {
    let follow_ups = source
        .unused_abilities()
        .filter(|a| abilities_combo(ability, a))
        .map(|a| FollowUp {
            ability: a.title.clone(),
            synergy: describe_synergy(ability, a).to_string(),
            timing: suggest_timing(a).to_string(),
        })
        .collect();

    let team_combos = view
        .living_units()
        .into_iter()
        .filter(|u| u.id != source.id && u.team == source.team)
        .flat_map(|ally| {
            ally.abilities
                .iter()
                .filter(|a| abilities_combo(ability, a))
                .map(move |a| TeamCombo {
                    ally: ally.id,
                    ally_name: ally.name.clone(),
                    ability: a.title.clone(),
                    synergy: describe_synergy(ability, a).to_string(),
                })
        })
        .collect();

    ComboPotential {
        follow_ups,
        team_combos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ability::DamageValue;
    use crate::board::battlefield::Battlefield;

    fn strike() -> Ability {
        Ability::new("Strike")
            .with_range(1, None)
            .with_damage("pierce", DamageValue::Flat(12.0))
            .with_damage("crush", DamageValue::Flat(10.0))
    }

    fn snare() -> Ability {
        Ability::new("Snare")
            .with_range(2, Some(3))
            .with_effect("Immobilize the target")
            .with_effect("Leaves a trap on the hex")
    }

    #[test]
    fn test_numeric_damage_sum() {
        let field = Battlefield::new(5, 5);
        let result = analyze_ability(&field, &strike(), None);
        assert_eq!(result.damage, 22.0);
        assert!(!result.has_control());
        assert_eq!(result.range, 1);
        assert_eq!(result.hexes_affected, 1);
    }

    #[test]
    fn test_control_context_only_with_target_and_control() {
        let mut field = Battlefield::new(5, 5);
        field.add_unit(Unit::new(1, "Target", 1, HexCoord::new(2, 2))).unwrap();
        let target = field.unit(UnitId(1)).unwrap();

        let plain = analyze_ability(&field, &strike(), Some(target));
        assert!(plain.control_context.is_none());

        let controlled = analyze_ability(&field, &snare(), Some(target));
        assert!(controlled.control_context.is_some());
        assert_eq!(controlled.control_count(), 2);

        let untargeted = analyze_ability(&field, &snare(), None);
        assert!(untargeted.control_context.is_none());
    }

    #[test]
    fn test_combo_needs_setup_and_follow_up() {
        let setup = Ability::new("Mark").with_effect("Target becomes vulnerable");
        assert!(abilities_combo(&setup, &strike()));
        assert!(!abilities_combo(&strike(), &setup));
        assert!(abilities_combo(&snare(), &strike()));
        assert!(!abilities_combo(&snare(), &Ability::new("Wait")));
    }

    #[test]
    fn test_describe_synergy_order() {
        let mark = Ability::new("Mark").with_effect("Target becomes vulnerable");
        assert_eq!(describe_synergy(&mark, &strike()), "Damage amplification");

        let execute = Ability::new("Execute").with_effect("Execute trapped units");
        assert_eq!(describe_synergy(&snare(), &execute), "Control chain");

        let costly = Ability::new("Push").with_effect("Push target").with_costs(8.0, 0.0);
        let costly_hit = strike().with_costs(5.0, 0.0);
        assert_eq!(describe_synergy(&costly, &costly_hit), "Resource pressure");
        assert_eq!(describe_synergy(&costly.with_costs(1.0, 0.0), &strike()), "Positional advantage");
        assert_eq!(describe_synergy(&snare(), &strike()), "General combo");
    }

    #[test]
    fn test_offensive_impact() {
        let impact = OffensiveImpact::of(&snare());
        assert_eq!(impact.control_duration, 2);
        assert_eq!(impact.area_coverage, 6);
        assert_eq!(impact.zone_control, 6);
        assert!(impact.damage_types.is_empty());

        let hit = OffensiveImpact::of(&strike());
        assert_eq!(hit.damage_types, vec!["crush".to_string(), "pierce".to_string()]);
        assert!((hit.predicted_value - (12.0 * 1.2 + 10.0 * 1.3) / 100.0).abs() < 1e-5);
        assert_eq!(hit.zone_control, 0);
    }

    #[test]
    fn test_target_analysis() {
        let mut field = Battlefield::new(7, 7);
        let caster = Unit::new(1, "Caster", 0, HexCoord::new(3, 3)).with_ability(strike());
        field.add_unit(caster).unwrap();
        let mut weak = Unit::new(2, "Weak", 1, HexCoord::new(4, 3));
        weak.health = 20.0;
        field.add_unit(weak).unwrap();
        field.add_unit(Unit::new(3, "Far", 1, HexCoord::new(6, 6))).unwrap();
        field.add_unit(Unit::new(4, "Friend", 0, HexCoord::new(2, 3))).unwrap();

        let source = field.unit(UnitId(1)).unwrap();
        let analysis = analyze_usage(&field, source, &strike());
        let targets = &analysis.target_analysis;
        assert_eq!(targets.valid_targets, vec![UnitId(2)]);
        assert_eq!(targets.optimal_targets[0].reason, "Low health target");
        assert_eq!(targets.vulnerable_targets[0].vulnerability, "Critical health");
        assert_eq!(analysis.strategic_context.team_position, "Numerical disadvantage");
        assert_eq!(analysis.strategic_context.threat_context, "Single threat nearby");
        assert_eq!(analysis.strategic_context.resource_state, "Resources available");
    }

    #[test]
    fn test_combo_potential_lists_allies() {
        let mut field = Battlefield::new(7, 7);
        let caster = Unit::new(1, "Trapper", 0, HexCoord::new(1, 1))
            .with_ability(snare())
            .with_ability(strike());
        field.add_unit(caster).unwrap();
        field
            .add_unit(Unit::new(2, "Friend", 0, HexCoord::new(5, 5)).with_ability(strike()))
            .unwrap();

        let source = field.unit(UnitId(1)).unwrap();
        let analysis = analyze_usage(&field, source, &snare());
        let combos = &analysis.strategic_context.combo_potential;
        assert_eq!(combos.follow_ups.len(), 1);
        assert_eq!(combos.follow_ups[0].ability, "Strike");
        assert_eq!(combos.follow_ups[0].timing, "Use when ready");
        assert_eq!(combos.team_combos.len(), 1);
        assert_eq!(combos.team_combos[0].ally, UnitId(2));
    }
}
