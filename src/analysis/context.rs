//! Situational context attached to control effects
//!
//! Built only when an ability actually imposes control: where the target
//! stands, what state it is in, and how the turn order and resources look.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::analysis::position::{movement_range_under, Placement, THREAT_RADIUS};
use crate::analysis::unit_state::UnitStateSnapshot;
use crate::board::effects::{ControlFlags, EffectKeywords};
use crate::board::hex::{HexCoord, HexDirection};
use crate::board::unit::Unit;
use crate::board::view::GameView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementConstraints {
    pub blocked_directions: u32,
    /// Three or more consecutive neighbor directions blocked
    pub corner_trapped: bool,
    /// Large unit with more than two blocked directions
    pub size_limited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneControl {
    pub friendly_zones: u32,
    pub enemy_zones: u32,
    pub contested_zones: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPosition {
    pub is_on_edge: bool,
    pub distance_from_center: u32,
    pub zone_control: ZoneControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatSynergy {
    pub melee_ranged_combo: bool,
    /// Distinct directions threats come from
    pub crossfire: u32,
    pub surround_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionThreat {
    pub adjacent_melee_units: u32,
    pub ranged_units_in_range: u32,
    pub nearest_ally_distance: Option<u32>,
    pub near_hazards: bool,
    pub movement_constraints: MovementConstraints,
    pub board_position: BoardPosition,
    pub threat_synergy: ThreatSynergy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOptions {
    pub total_spaces: u32,
    pub safe_spaces: u32,
    /// Safe spaces with fewer weighted threats than the current hex
    pub optimal_spaces: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    /// Activations until the next enemy acts, wrapping around the round
    pub next_active_enemy: Option<u32>,
    pub allies_before_enemy: u32,
    pub queue_advantage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub team_plasma: f32,
    pub enemy_plasma: f32,
    pub plasma_advantage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityTiming {
    pub critical_abilities_used: Vec<String>,
    pub combo_setup_potential: bool,
    pub counterplay_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticalState {
    pub turns_until_action: u32,
    pub escape_routes: u32,
    pub incoming_damage: f32,
    pub plasma_available: bool,
    pub movement_options: MovementOptions,
    pub queue_state: QueueState,
    pub resource_state: ResourceState,
    pub ability_timing: AbilityTiming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlContext {
    pub position_threat: PositionThreat,
    pub unit_state: UnitStateSnapshot,
    pub tactical_state: TacticalState,
}

impl ControlContext {
    pub fn build<V: GameView + ?Sized>(view: &V, target: &Unit, control: ControlFlags) -> Self {
        Self {
            position_threat: position_threat(view, target),
            unit_state: UnitStateSnapshot::capture(target),
            tactical_state: tactical_state(view, target, control),
        }
    }
}

fn nearby<'a, V: GameView + ?Sized>(view: &'a V, target: &'a Unit) -> impl Iterator<Item = &'a Unit> {
    view.units()
        .iter()
        .filter(move |u| u.alive && u.id != target.id && target.distance_to(u) <= THREAT_RADIUS)
}

fn blocked<V: GameView + ?Sized>(view: &V, target: &Unit, hex: HexCoord) -> bool {
    !view.in_bounds(hex)
        || view.is_hazard(hex)
        || view.unit_at(hex).map_or(false, |u| u.id != target.id)
}

fn position_threat<V: GameView + ?Sized>(view: &V, target: &Unit) -> PositionThreat {
    let mut melee = 0;
    let mut ranged = 0;
    let mut directions = BTreeSet::new();
    let mut zones = ZoneControl {
        friendly_zones: 0,
        enemy_zones: 0,
        contested_zones: 0,
    };

    for other in nearby(view, target) {
        if other.team != target.team {
            if target.distance_to(other) == 1 && other.has_melee_ability() {
                melee += 1;
            } else {
                ranged += 1;
            }
            if let Some(d) = HexDirection::toward(target.position, other.position) {
                directions.insert(d);
            }
            zones.enemy_zones += 1;
        } else {
            zones.friendly_zones += 1;
        }
        let contested = view
            .living_units()
            .iter()
            .any(|u| u.team != other.team && u.distance_to(other) <= 1);
        if contested {
            zones.contested_zones += 1;
        }
    }

    let nearest_ally_distance = view
        .living_units()
        .iter()
        .filter(|u| u.id != target.id && u.team == target.team)
        .map(|u| target.distance_to(u))
        .min();

    let near_hazards = target
        .position
        .hexes_in_range(THREAT_RADIUS)
        .iter()
        .any(|h| view.is_hazard(*h));

    let neighbor_blocked: Vec<bool> = target
        .position
        .neighbors()
        .iter()
        .map(|h| blocked(view, target, *h))
        .collect();
    let blocked_directions = neighbor_blocked.iter().filter(|b| **b).count() as u32;
    let corner_trapped = longest_cyclic_run(&neighbor_blocked) >= 3;
    let is_on_edge = target.position.neighbors().iter().any(|h| !view.in_bounds(*h));

    PositionThreat {
        adjacent_melee_units: melee,
        ranged_units_in_range: ranged,
        nearest_ally_distance,
        near_hazards,
        movement_constraints: MovementConstraints {
            blocked_directions,
            corner_trapped,
            size_limited: target.size > 1 && blocked_directions > 2,
        },
        board_position: BoardPosition {
            is_on_edge,
            distance_from_center: view.center().distance(&target.position),
            zone_control: zones,
        },
        threat_synergy: ThreatSynergy {
            melee_ranged_combo: melee > 0 && ranged > 0,
            crossfire: directions.len() as u32,
            surround_level: melee,
        },
    }
}

/// Longest run of `true` in a ring
fn longest_cyclic_run(ring: &[bool]) -> usize {
    if ring.iter().all(|b| *b) {
        return ring.len();
    }
    let mut best = 0;
    let mut run = 0;
    for b in ring.iter().chain(ring.iter()) {
        if *b {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best.min(ring.len())
}

fn tactical_state<V: GameView + ?Sized>(view: &V, target: &Unit, control: ControlFlags) -> TacticalState {
    let placement = Placement::current(view, target);
    let enemies: Vec<&Unit> = nearby(view, target)
        .filter(|u| u.team != target.team)
        .collect();

    let mut incoming: f32 = enemies
        .iter()
        .flat_map(|e| e.unused_abilities())
        .filter(|a| a.has_damage())
        .map(|a| a.total_damage())
        .sum();
    if control.intersects(ControlFlags::CRYOSTASIS | ControlFlags::NO_ACTION) {
        incoming *= 2.0;
    } else if control.intersects(ControlFlags::FROZEN | ControlFlags::IMMOBILIZE) {
        incoming *= 1.5;
    }
    for enemy in &enemies {
        if enemy.stats.health > target.stats.health * 1.5 {
            incoming *= 1.25;
        }
    }

    let movement_range = movement_range_under(target, control);
    let all_spaces: Vec<HexCoord> = target
        .position
        .ring_area(movement_range)
        .into_iter()
        .filter(|h| placement.is_valid_destination(*h))
        .collect();
    let safe_spaces: Vec<HexCoord> = all_spaces
        .iter()
        .copied()
        .filter(|h| placement.is_safe(*h))
        .collect();
    let current_threats = placement.surrounding_threats();
    let optimal = safe_spaces
        .iter()
        .filter(|h| Placement::new(view, target, **h).surrounding_threats() < current_threats)
        .count();

    let team_plasma = view.team_plasma(target.team);
    let enemy_plasma = view.enemy_plasma(target.team);

    TacticalState {
        turns_until_action: view.queue_index(target.id).unwrap_or(0) as u32,
        escape_routes: placement.escape_routes_under(control) as u32,
        incoming_damage: incoming,
        plasma_available: team_plasma > 0.0,
        movement_options: MovementOptions {
            total_spaces: all_spaces.len() as u32,
            safe_spaces: safe_spaces.len() as u32,
            optimal_spaces: optimal as u32,
        },
        queue_state: queue_state(view, target),
        resource_state: ResourceState {
            team_plasma,
            enemy_plasma,
            plasma_advantage: team_plasma > enemy_plasma,
        },
        ability_timing: AbilityTiming {
            critical_abilities_used: target
                .used_abilities()
                .filter(|a| a.has_damage() || !a.effects.is_empty())
                .map(|a| a.title.clone())
                .collect(),
            combo_setup_potential: target
                .unused_abilities()
                .any(|a| a.keywords().contains(EffectKeywords::COMBO_SETUP)),
            counterplay_available: target
                .unused_abilities()
                .any(|a| a.keywords().contains(EffectKeywords::DEFENSIVE)),
        },
    }
}

fn queue_state<V: GameView + ?Sized>(view: &V, target: &Unit) -> QueueState {
    let queue = view.queue();
    let Some(current) = view.queue_index(target.id) else {
        return QueueState {
            next_active_enemy: None,
            allies_before_enemy: 0,
            queue_advantage: false,
        };
    };

    let mut allies = 0;
    let mut next_enemy = None;
    for step in 1..queue.len() {
        let id = queue[(current + step) % queue.len()];
        match view.unit(id) {
            Some(u) if u.team != target.team => {
                next_enemy = Some(step as u32);
                break;
            }
            Some(_) => allies += 1,
            None => {}
        }
    }
    let allies_before_enemy = if next_enemy.is_some() { allies } else { 0 };

    QueueState {
        next_active_enemy: next_enemy,
        allies_before_enemy,
        queue_advantage: allies_before_enemy > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ability::{Ability, DamageValue};
    use crate::board::battlefield::Battlefield;
    use crate::core::types::{TeamId, UnitId};

    fn melee(id: u32, team: u8, hex: HexCoord) -> Unit {
        Unit::new(id, "Brute", team, hex).with_ability(
            Ability::new("Smash")
                .with_range(1, None)
                .with_damage("crush", DamageValue::Flat(10.0)),
        )
    }

    #[test]
    fn test_cyclic_run() {
        assert_eq!(longest_cyclic_run(&[true, false, false, false, true, true]), 3);
        assert_eq!(longest_cyclic_run(&[true; 6]), 6);
        assert_eq!(longest_cyclic_run(&[false; 6]), 0);
    }

    #[test]
    fn test_corner_unit_is_corner_trapped() {
        let mut field = Battlefield::new(6, 6);
        field.add_unit(Unit::new(1, "Scout", 0, HexCoord::new(0, 0))).unwrap();
        let target = field.unit(UnitId(1)).unwrap();
        let ctx = ControlContext::build(&field, target, ControlFlags::TRAP);
        assert!(ctx.position_threat.movement_constraints.corner_trapped);
        assert!(ctx.position_threat.board_position.is_on_edge);
        assert_eq!(ctx.position_threat.movement_constraints.blocked_directions, 4);
    }

    #[test]
    fn test_melee_and_ranged_counts() {
        let mut field = Battlefield::new(9, 9);
        field.add_unit(Unit::new(1, "Scout", 0, HexCoord::new(4, 4))).unwrap();
        field.add_unit(melee(2, 1, HexCoord::new(5, 4))).unwrap();
        field.add_unit(melee(3, 1, HexCoord::new(3, 4))).unwrap();
        field.add_unit(Unit::new(4, "Archer", 1, HexCoord::new(4, 6))).unwrap();
        field.add_unit(Unit::new(5, "Friend", 0, HexCoord::new(7, 7))).unwrap();
        let target = field.unit(UnitId(1)).unwrap();

        let ctx = ControlContext::build(&field, target, ControlFlags::DIZZY);
        let threat = &ctx.position_threat;
        assert_eq!(threat.adjacent_melee_units, 2);
        assert_eq!(threat.ranged_units_in_range, 1);
        assert!(threat.threat_synergy.melee_ranged_combo);
        assert_eq!(threat.threat_synergy.crossfire, 3);
        assert_eq!(threat.nearest_ally_distance, Some(6));
        assert_eq!(threat.board_position.zone_control.enemy_zones, 3);
    }

    #[test]
    fn test_incoming_damage_scales_with_control() {
        let mut field = Battlefield::new(9, 9);
        field.add_unit(Unit::new(1, "Scout", 0, HexCoord::new(4, 4))).unwrap();
        field.add_unit(melee(2, 1, HexCoord::new(5, 4))).unwrap();
        let target = field.unit(UnitId(1)).unwrap();

        let plain = ControlContext::build(&field, target, ControlFlags::DIZZY);
        let frozen = ControlContext::build(&field, target, ControlFlags::FROZEN);
        let stasis = ControlContext::build(
            &field,
            target,
            ControlFlags::FROZEN | ControlFlags::CRYOSTASIS,
        );
        assert_eq!(plain.tactical_state.incoming_damage, 10.0);
        assert_eq!(frozen.tactical_state.incoming_damage, 15.0);
        assert_eq!(stasis.tactical_state.incoming_damage, 20.0);
        assert_eq!(frozen.tactical_state.escape_routes, 0);
    }

    #[test]
    fn test_big_enemy_raises_incoming_damage() {
        let mut field = Battlefield::new(9, 9);
        field.add_unit(Unit::new(1, "Scout", 0, HexCoord::new(4, 4))).unwrap();
        let mut giant = melee(2, 1, HexCoord::new(5, 4));
        giant.stats.health = 400.0;
        field.add_unit(giant).unwrap();
        let target = field.unit(UnitId(1)).unwrap();
        let ctx = ControlContext::build(&field, target, ControlFlags::DIZZY);
        assert_eq!(ctx.tactical_state.incoming_damage, 12.5);
    }

    #[test]
    fn test_queue_state_wraps_around() {
        let mut field = Battlefield::new(9, 9);
        let mut a = Unit::new(1, "A", 0, HexCoord::new(0, 0));
        a.stats.initiative = 90.0;
        let mut b = Unit::new(2, "B", 0, HexCoord::new(2, 0));
        b.stats.initiative = 80.0;
        let mut c = Unit::new(3, "C", 1, HexCoord::new(8, 8));
        c.stats.initiative = 70.0;
        field.add_unit(a).unwrap();
        field.add_unit(b).unwrap();
        field.add_unit(c).unwrap();
        field.set_plasma(TeamId(0), 2.0);

        let first = field.unit(UnitId(1)).unwrap();
        let ctx = ControlContext::build(&field, first, ControlFlags::DIZZY);
        assert_eq!(ctx.tactical_state.turns_until_action, 0);
        assert_eq!(ctx.tactical_state.queue_state.next_active_enemy, Some(2));
        assert_eq!(ctx.tactical_state.queue_state.allies_before_enemy, 1);
        assert!(ctx.tactical_state.queue_state.queue_advantage);
        assert!(ctx.tactical_state.resource_state.plasma_advantage);
    }

    #[test]
    fn test_hindered_limits_movement_options() {
        let mut field = Battlefield::new(9, 9);
        let mut scout = Unit::new(1, "Scout", 0, HexCoord::new(4, 4));
        scout.stats.movement = 3;
        field.add_unit(scout).unwrap();
        let target = field.unit(UnitId(1)).unwrap();
        let ctx = ControlContext::build(&field, target, ControlFlags::HINDERED);
        assert_eq!(ctx.tactical_state.movement_options.total_spaces, 6);
        assert_eq!(ctx.tactical_state.escape_routes, 6);
    }
}
