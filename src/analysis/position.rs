//! Position dimension: escape routes, zone control and movement quality
//!
//! Every evaluation is done for a unit standing at an anchor hex that may
//! differ from its real position. Relocation is logical; game state is never
//! touched.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::ability::abilities_combo;
use crate::board::ability::Ability;
use crate::board::effects::{ControlFlags, EffectKeywords};
use crate::board::hex::HexCoord;
use crate::board::unit::Unit;
use crate::board::view::GameView;
use crate::core::types::{clamp01, TeamId, UnitId};

/// Radius in which enemies count as nearby threats
pub const THREAT_RADIUS: u32 = 2;
/// Radius in which allies count as support
pub const SUPPORT_RADIUS: u32 = 2;
/// Radius searched for allies able to combo with an ability
pub const SYNERGY_RADIUS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityFactors {
    pub safety: f32,
    pub control: f32,
    pub mobility: f32,
    pub tactical: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityDetails {
    pub escape_routes: usize,
    pub nearby_threats: usize,
    pub controlled_zones: usize,
    pub contested_zones: usize,
    pub center_proximity: f32,
    pub ally_support: f32,
}

/// How good a hex is for a unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionQuality {
    pub value: f32,
    pub factors: QualityFactors,
    pub details: QualityDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvantageFactors {
    pub positional: f32,
    pub numerical: f32,
    pub resource: f32,
    pub momentum: f32,
}

/// Team-level balance; negative values mean disadvantage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TacticalAdvantage {
    pub value: f32,
    pub factors: AdvantageFactors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedMove {
    pub position: HexCoord,
    pub quality: f32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementEvaluation {
    pub before: PositionQuality,
    pub quality: PositionQuality,
    pub advantage: TacticalAdvantage,
    /// after - before, in [-1, 1]
    pub improvement: f32,
    /// Better destinations reachable from the start, best first
    pub suggested_moves: Vec<SuggestedMove>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceAnalysis {
    pub nearest_ally_distance: Option<u32>,
    /// Largest distance between two living allies
    pub unit_spread: u32,
    pub nearby_allies: usize,
    pub nearby_enemies: usize,
}

/// A unit logically standing at `anchor`
pub struct Placement<'a, V: GameView + ?Sized> {
    view: &'a V,
    unit: &'a Unit,
    anchor: HexCoord,
}

impl<'a, V: GameView + ?Sized> Placement<'a, V> {
    pub fn new(view: &'a V, unit: &'a Unit, anchor: HexCoord) -> Self {
        Self { view, unit, anchor }
    }

    /// The unit where it actually stands
    pub fn current(view: &'a V, unit: &'a Unit) -> Self {
        Self::new(view, unit, unit.position)
    }

    fn others(&self) -> impl Iterator<Item = &'a Unit> + '_ {
        let id = self.unit.id;
        self.view.units().iter().filter(move |u| u.alive && u.id != id)
    }

    fn enemies(&self) -> impl Iterator<Item = &'a Unit> + '_ {
        let team = self.unit.team;
        self.others().filter(move |u| u.team != team)
    }

    fn allies(&self) -> impl Iterator<Item = &'a Unit> + '_ {
        let team = self.unit.team;
        self.others().filter(move |u| u.team == team)
    }

    fn footprint(&self) -> Vec<HexCoord> {
        self.unit.footprint_at(self.anchor)
    }

    /// Distance from the placed footprint to another unit
    pub fn distance_to(&self, other: &Unit) -> u32 {
        self.footprint()
            .iter()
            .flat_map(|h| other.occupied_hexes().into_iter().map(move |o| h.distance(&o)))
            .min()
            .unwrap_or(u32::MAX)
    }

    fn occupied_by_other(&self, hex: HexCoord) -> bool {
        self.others().any(|u| u.occupies(hex))
    }

    /// Free, in-bounds, hazard-free hex the unit's whole footprint fits into
    pub fn is_valid_destination(&self, anchor: HexCoord) -> bool {
        self.unit.footprint_at(anchor).iter().all(|h| {
            self.view.in_bounds(*h) && !self.view.is_hazard(*h) && !self.occupied_by_other(*h)
        })
    }

    /// No enemy stands next to `hex`
    pub fn is_safe(&self, hex: HexCoord) -> bool {
        !hex
            .neighbors()
            .iter()
            .any(|n| self.enemies().any(|e| e.occupies(*n)))
    }

    /// Safe destinations within `range`, skipping `excluded` hexes
    pub fn escape_hexes(&self, range: u32, excluded: &[HexCoord]) -> Vec<HexCoord> {
        self.anchor
            .ring_area(range)
            .into_iter()
            .filter(|h| !excluded.contains(h))
            .filter(|h| self.is_valid_destination(*h) && self.is_safe(*h))
            .collect()
    }

    pub fn escape_routes(&self) -> usize {
        self.escape_hexes(self.unit.stats.movement, &[]).len()
    }

    /// Escape routes once the given control effects land
    pub fn escape_routes_under(&self, control: ControlFlags) -> usize {
        if control.intersects(ControlFlags::FROZEN | ControlFlags::CRYOSTASIS | ControlFlags::NO_ACTION) {
            return 0;
        }
        self.escape_hexes(movement_range_under(self.unit, control), &[]).len()
    }

    /// Enemies within the threat radius
    pub fn nearby_threats(&self) -> usize {
        self.enemies()
            .filter(|e| self.distance_to(e) <= THREAT_RADIUS)
            .count()
    }

    /// Weighted threat count: adjacent enemies count double
    pub fn surrounding_threats(&self) -> u32 {
        self.enemies()
            .map(|e| match self.distance_to(e) {
                1 => 2,
                d if d <= THREAT_RADIUS => 1,
                _ => 0,
            })
            .sum()
    }

    pub fn ally_support(&self) -> f32 {
        let allies = self
            .allies()
            .filter(|a| self.distance_to(a) <= SUPPORT_RADIUS)
            .count();
        (allies as f32 / 3.0).min(1.0)
    }

    pub fn center_proximity(&self) -> f32 {
        center_proximity(self.view, self.anchor)
    }

    /// (team, footprint) of every living unit with this unit relocated
    fn layout(&self) -> Vec<(TeamId, Vec<HexCoord>)> {
        self.others()
            .map(|u| (u.team, u.occupied_hexes()))
            .chain(std::iter::once((self.unit.team, self.footprint())))
            .collect()
    }

    pub fn quality(&self) -> PositionQuality {
        let layout = self.layout();
        let escape_routes = self.escape_routes();
        let nearby_threats = self.nearby_threats();
        let controlled_zones = controlled_zones(self.view, &layout, self.unit.team);
        let contested_zones = contested_zones(self.view, &layout);
        let center_proximity = self.center_proximity();
        let ally_support = self.ally_support();

        let safety = (escape_routes as f32 / 6.0).min(1.0)
            * (1.0 - (nearby_threats as f32 / 4.0).min(1.0));
        let control = (controlled_zones as f32 - contested_zones as f32)
            / (controlled_zones + contested_zones).max(1) as f32;
        let mobility = (escape_routes as f32 / 8.0).min(1.0);
        let tactical = (center_proximity + ally_support) / 2.0;

        PositionQuality {
            value: safety * 0.4 + control * 0.3 + mobility * 0.2 + tactical * 0.1,
            factors: QualityFactors {
                safety,
                control,
                mobility,
                tactical,
            },
            details: QualityDetails {
                escape_routes,
                nearby_threats,
                controlled_zones,
                contested_zones,
                center_proximity,
                ally_support,
            },
        }
    }

    pub fn tactical_advantage(&self) -> TacticalAdvantage {
        let layout = self.layout();
        let team = self.unit.team;

        let team_zones = controlled_zones(self.view, &layout, team);
        let mut enemy_teams: Vec<TeamId> = layout
            .iter()
            .map(|(t, _)| *t)
            .filter(|t| *t != team)
            .collect();
        enemy_teams.sort();
        enemy_teams.dedup();
        let enemy_zones: usize = enemy_teams
            .into_iter()
            .map(|t| controlled_zones(self.view, &layout, t))
            .sum();
        let positional = balance(team_zones as f32, enemy_zones as f32);

        let living = self.view.living_units();
        let side = |ours: bool| living.iter().filter(move |u| (u.team == team) == ours);
        let numerical = balance(
            side(true).map(|u| threat_value(u)).sum(),
            side(false).map(|u| threat_value(u)).sum(),
        );
        let resource = balance(
            side(true).map(|u| u.energy_ratio() + u.health_ratio()).sum(),
            side(false).map(|u| u.energy_ratio() + u.health_ratio()).sum(),
        );
        let momentum = initiative_advantage(self.view, team);

        TacticalAdvantage {
            value: positional * 0.4 + numerical * 0.3 + resource * 0.2 + momentum * 0.1,
            factors: AdvantageFactors {
                positional,
                numerical,
                resource,
                momentum,
            },
        }
    }

    pub fn distances(&self) -> DistanceAnalysis {
        let allies: Vec<&Unit> = self.allies().collect();
        let mut spread = 0;
        let mut team: Vec<Vec<HexCoord>> = allies.iter().map(|a| a.occupied_hexes()).collect();
        team.push(self.footprint());
        for (i, a) in team.iter().enumerate() {
            for b in team.iter().skip(i + 1) {
                let d = a
                    .iter()
                    .flat_map(|x| b.iter().map(move |y| x.distance(y)))
                    .min()
                    .unwrap_or(0);
                spread = spread.max(d);
            }
        }
        DistanceAnalysis {
            nearest_ally_distance: allies.iter().map(|a| self.distance_to(a)).min(),
            unit_spread: spread,
            nearby_allies: allies
                .iter()
                .filter(|a| self.distance_to(a) <= THREAT_RADIUS)
                .count(),
            nearby_enemies: self.nearby_threats(),
        }
    }
}

/// Movement allowed under control effects
pub fn movement_range_under(unit: &Unit, control: ControlFlags) -> u32 {
    if control.contains(ControlFlags::HINDERED) {
        1
    } else if control.contains(ControlFlags::IMMOBILIZE) {
        0
    } else {
        unit.stats.movement
    }
}

/// 1 at the board center, 0 at the edge
pub fn center_proximity<V: GameView + ?Sized>(view: &V, hex: HexCoord) -> f32 {
    let distance = view.center().distance(&hex) as f32;
    clamp01(1.0 - distance / view.max_center_distance() as f32)
}

/// Offensive weight of a unit: health and energy scaled by offense and options
pub fn threat_value(unit: &Unit) -> f32 {
    let unused = unit.unused_abilities().count() as f32;
    unit.health_ratio() * unit.energy_ratio() * (unit.stats.offense / 10.0) * (1.0 + unused / 4.0)
}

/// 1 when the team holds the front of the queue, 0 at the back
pub fn initiative_advantage<V: GameView + ?Sized>(view: &V, team: TeamId) -> f32 {
    let queue = view.queue();
    let positions: Vec<usize> = queue
        .iter()
        .enumerate()
        .filter(|(_, id)| view.unit(**id).map_or(false, |u| u.team == team))
        .map(|(i, _)| i)
        .collect();
    if positions.is_empty() || queue.is_empty() {
        return 0.0;
    }
    let average = positions.iter().sum::<usize>() as f32 / positions.len() as f32;
    1.0 - average / queue.len() as f32
}

fn balance(ours: f32, theirs: f32) -> f32 {
    (ours - theirs) / (ours + theirs).max(1.0)
}

fn board_hexes<V: GameView + ?Sized>(view: &V) -> impl Iterator<Item = HexCoord> {
    let (width, height) = (view.width() as i32, view.height() as i32);
    (0..width).flat_map(move |q| (0..height).map(move |r| HexCoord::new(q, r)))
}

/// Hexes occupied by the team or adjacent to one of its units
fn controlled_zones<V: GameView + ?Sized>(
    view: &V,
    layout: &[(TeamId, Vec<HexCoord>)],
    team: TeamId,
) -> usize {
    board_hexes(view)
        .filter(|hex| {
            layout
                .iter()
                .filter(|(t, _)| *t == team)
                .any(|(_, hexes)| hexes.iter().any(|h| h.distance(hex) <= 1))
        })
        .count()
}

/// Occupied hexes with an enemy of the occupant adjacent
fn contested_zones<V: GameView + ?Sized>(view: &V, layout: &[(TeamId, Vec<HexCoord>)]) -> usize {
    board_hexes(view)
        .filter(|hex| {
            let Some((owner, _)) = layout.iter().find(|(_, hexes)| hexes.contains(hex)) else {
                return false;
            };
            layout
                .iter()
                .filter(|(t, _)| t != owner)
                .any(|(_, hexes)| hexes.iter().any(|h| h.distance(hex) <= 1))
        })
        .count()
}

/// Would `ability`, cast by `source`, leave `target` with at most one escape route?
///
/// A target already down to one route is not counted as newly blocked.
pub fn will_block_escape_routes<V: GameView + ?Sized>(
    view: &V,
    source: &Unit,
    target: &Unit,
    ability: &Ability,
) -> bool {
    let placement = Placement::current(view, target);
    if placement.escape_routes() <= 1 {
        return false;
    }
    let affected = ability.affected_hexes(source.position);
    placement
        .escape_hexes(target.stats.movement, &affected)
        .len()
        <= 1
}

/// Pinning ability landing on a target with two or more weighted threats around
pub fn will_trap_target<V: GameView + ?Sized>(view: &V, target: &Unit, ability: &Ability) -> bool {
    ability.keywords().contains(EffectKeywords::PINNING)
        && Placement::current(view, target).surrounding_threats() >= 2
}

pub fn will_force_movement(ability: &Ability) -> bool {
    ability.keywords().contains(EffectKeywords::FORCED_MOVEMENT)
}

/// Support ability, or one an ally within reach can follow up on
pub fn check_team_synergies<V: GameView + ?Sized>(view: &V, source: &Unit, ability: &Ability) -> bool {
    let allies: Vec<&Unit> = view
        .living_units()
        .into_iter()
        .filter(|u| u.id != source.id && u.team == source.team)
        .filter(|u| source.distance_to(u) <= SYNERGY_RADIUS)
        .collect();
    if allies.is_empty() {
        return false;
    }
    if ability.keywords().contains(EffectKeywords::SUPPORT) {
        return true;
    }
    allies
        .iter()
        .any(|ally| ally.abilities.iter().any(|a| abilities_combo(ability, a)))
}

/// Compare standing at `from` with standing at `to`
pub fn evaluate_movement<V: GameView + ?Sized>(
    view: &V,
    unit: &Unit,
    from: HexCoord,
    to: HexCoord,
) -> MovementEvaluation {
    let start = Placement::new(view, unit, from);
    let end = Placement::new(view, unit, to);
    let before = start.quality();
    let quality = end.quality();

    MovementEvaluation {
        before,
        quality,
        advantage: end.tactical_advantage(),
        improvement: quality.value - before.value,
        suggested_moves: better_moves(view, unit, from, quality.value),
    }
}

fn better_moves<V: GameView + ?Sized>(
    view: &V,
    unit: &Unit,
    from: HexCoord,
    threshold: f32,
) -> Vec<SuggestedMove> {
    let start = Placement::new(view, unit, from);
    let mut moves: Vec<SuggestedMove> = from
        .ring_area(unit.stats.movement)
        .into_iter()
        .filter(|h| start.is_valid_destination(*h))
        .filter_map(|hex| {
            let candidate = Placement::new(view, unit, hex);
            let quality = candidate.quality().value;
            (quality > threshold).then(|| SuggestedMove {
                position: hex,
                quality,
                reason: explain_improvement(&start, &candidate),
            })
        })
        .collect();
    moves.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    moves
}

fn explain_improvement<V: GameView + ?Sized>(from: &Placement<'_, V>, to: &Placement<'_, V>) -> String {
    let mut reasons = Vec::new();
    if to.nearby_threats() < from.nearby_threats() {
        reasons.push("Reduces nearby threats");
    }
    if to.escape_routes() > from.escape_routes() {
        reasons.push("Increases escape options");
    }
    if to.center_proximity() > from.center_proximity() {
        reasons.push("Better board position");
    }
    if to.ally_support() > from.ally_support() {
        reasons.push("Better ally support");
    }
    if reasons.is_empty() {
        "Generally better position".to_string()
    } else {
        reasons.join(", ")
    }
}

/// Remembers where each unit began its activation
#[derive(Debug, Default)]
pub struct PositionAnalyzer {
    start_positions: AHashMap<UnitId, HexCoord>,
}

impl PositionAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_activation(&mut self, unit: &Unit) {
        self.start_positions.insert(unit.id, unit.position);
        tracing::debug!(unit = %unit.id, position = %unit.position, "Stored activation start position");
    }

    pub fn start_position(&self, id: UnitId) -> Option<HexCoord> {
        self.start_positions.get(&id).copied()
    }

    pub fn clear_start_position(&mut self, id: UnitId) -> Option<HexCoord> {
        self.start_positions.remove(&id)
    }
}
