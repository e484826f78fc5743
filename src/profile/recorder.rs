//! Event recorder: turns game events into profile mutations

use std::collections::{BTreeMap, VecDeque};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::ability::{analyze_ability, AbilityThreatResult, SummonedUnit};
use crate::analysis::context::ControlContext;
use crate::board::effects::{classify_text, normalize_control};
use crate::board::hex::HexCoord;
use crate::board::unit::Unit;
use crate::board::view::GameView;
use crate::core::types::{Timestamp, UnitId};
use crate::profile::movement::{MovementRecord, MovementTracker};
use crate::profile::store::ProfileStore;
use crate::profile::ThreatSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageRecord {
    pub damage: f32,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRecord {
    pub effect: String,
    pub timestamp: Timestamp,
}

/// What a status effect was attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectTarget {
    Unit(UnitId),
    Hex(HexCoord),
}

/// Builds snapshots and keeps the raw damage and control logs
///
/// Each log keeps at most `log_capacity` records, oldest evicted first.
#[derive(Debug)]
pub struct EventRecorder {
    damage_history: AHashMap<(UnitId, UnitId), VecDeque<DamageRecord>>,
    control_history: AHashMap<(UnitId, String), VecDeque<ControlRecord>>,
    movement: MovementTracker,
    log_capacity: usize,
}

fn push_bounded<T>(log: &mut VecDeque<T>, record: T, capacity: usize) {
    log.push_back(record);
    while log.len() > capacity {
        log.pop_front();
    }
}

fn snapshot<V: GameView + ?Sized>(
    view: &V,
    source: UnitId,
    target: UnitId,
    threat_result: AbilityThreatResult,
    timestamp: Timestamp,
) -> ThreatSnapshot {
    ThreatSnapshot {
        timestamp,
        turn_number: view.turn(),
        round_number: view.round_number(),
        target_id: target,
        source_id: source,
        threat_result,
    }
}

impl EventRecorder {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            damage_history: AHashMap::new(),
            control_history: AHashMap::new(),
            movement: MovementTracker::new(),
            log_capacity: log_capacity.max(1),
        }
    }

    /// Record damage dealt by `source` to `target`
    ///
    /// The snapshot describes the source's last used ability with the damage
    /// actually dealt; without one it is a plain single-target hit.
    pub fn record_damage<V: GameView + ?Sized>(
        &mut self,
        store: &mut ProfileStore,
        view: &V,
        source: &Unit,
        target: &Unit,
        damages: &BTreeMap<String, f32>,
        timestamp: Timestamp,
    ) -> ThreatSnapshot {
        let total: f32 = damages.values().sum();
        push_bounded(
            self.damage_history.entry((source.id, target.id)).or_default(),
            DamageRecord {
                damage: total,
                timestamp,
            },
            self.log_capacity,
        );

        let result = match source.last_used_ability() {
            Some(ability) => AbilityThreatResult {
                damage: total,
                ..analyze_ability(view, ability, Some(target))
            },
            None => AbilityThreatResult::basic(total),
        };
        let snap = snapshot(view, source.id, target.id, result, timestamp);

        tracing::info!(
            source = %source.id,
            target = %target.id,
            damage = total,
            "Recorded damage"
        );

        let profile = store.ensure(source);
        profile.push_snapshot(snap.clone(), None);
        profile.mark_active(view.turn());
        profile.recompute(Some(source));
        snap
    }

    /// Record a status effect `source` attached
    ///
    /// The effect's own control flags are merged with those of the source's
    /// last used ability. Effects placed on a hex are recorded against the
    /// source itself.
    pub fn record_control<V: GameView + ?Sized>(
        &mut self,
        store: &mut ProfileStore,
        view: &V,
        source: &Unit,
        effect: &str,
        target: EffectTarget,
        timestamp: Timestamp,
    ) -> ThreatSnapshot {
        push_bounded(
            self.control_history.entry((source.id, effect.to_string())).or_default(),
            ControlRecord {
                effect: effect.to_string(),
                timestamp,
            },
            self.log_capacity,
        );

        let target_unit = match target {
            EffectTarget::Unit(id) => view.unit(id),
            EffectTarget::Hex(_) => None,
        };
        let target_id = target_unit.map_or(source.id, |t| t.id);

        let effect_flags = classify_text(effect).control;
        let base = match source.last_used_ability() {
            Some(ability) => analyze_ability(view, ability, None),
            None => AbilityThreatResult::basic(0.0),
        };
        let control = normalize_control(base.control_effects | effect_flags);
        let control_context = match target_unit {
            Some(t) if !control.is_empty() => Some(ControlContext::build(view, t, control)),
            _ => None,
        };
        let result = AbilityThreatResult {
            control_effects: control,
            control_context,
            ..base
        };
        let snap = snapshot(view, source.id, target_id, result, timestamp);

        tracing::info!(
            source = %source.id,
            target = %target_id,
            effect,
            control = ?control,
            "Recorded control effect"
        );

        let profile = store.ensure(source);
        profile.push_snapshot(snap.clone(), Some(effect));
        profile.mark_active(view.turn());
        profile.recompute(Some(source));
        snap
    }

    /// Analyze an ability as it is used and remember the result
    pub fn record_ability_use<V: GameView + ?Sized>(
        &mut self,
        store: &mut ProfileStore,
        view: &V,
        source: &Unit,
        ability_title: &str,
        target: Option<&Unit>,
    ) -> Option<AbilityThreatResult> {
        let ability = source.ability(ability_title)?;
        let result = analyze_ability(view, ability, target);

        tracing::debug!(
            source = %source.id,
            ability = ability_title,
            damage = result.damage,
            range = result.range,
            "Recorded ability use"
        );

        let profile = store.ensure(source);
        profile.set_ability(ability_title, result.clone());
        profile.mark_active(view.turn());
        profile.recompute(Some(source));
        Some(result)
    }

    /// Remember which unit an ability summoned
    pub fn record_summon<V: GameView + ?Sized>(
        &mut self,
        store: &mut ProfileStore,
        view: &V,
        summoner: &Unit,
        summoned: &Unit,
        ability_title: &str,
    ) -> AbilityThreatResult {
        let range = summoner
            .ability(ability_title)
            .and_then(|a| a.range)
            .map_or(1, |r| r.regular.max(1));
        let result = AbilityThreatResult {
            range,
            summoned_unit: Some(SummonedUnit {
                id: summoned.id,
                unit_type: summoned.name.clone(),
                position: summoned.position,
            }),
            ..AbilityThreatResult::basic(0.0)
        };

        tracing::info!(
            summoner = %summoner.id,
            summoned = %summoned.id,
            ability = ability_title,
            "Recorded summon"
        );

        let profile = store.ensure(summoner);
        profile.set_ability(ability_title, result.clone());
        profile.mark_active(view.turn());
        profile.recompute(Some(summoner));
        result
    }

    /// Fold a movement step, or a whole move, into the unit's move this turn
    pub fn record_movement<V: GameView + ?Sized>(
        &mut self,
        store: &mut ProfileStore,
        view: &V,
        unit: &Unit,
        from: HexCoord,
        to: HexCoord,
    ) -> MovementRecord {
        let record = self.movement.step(unit, view.turn(), from, to);
        tracing::debug!(
            unit = %unit.id,
            from = %record.from,
            to = %record.to,
            ability = ?record.ability,
            "Recorded movement"
        );

        let profile = store.ensure(unit);
        profile.set_last_movement(record.clone());
        profile.mark_active(view.turn());
        profile.recompute(Some(unit));
        record
    }

    pub fn end_turn(&mut self, turn: crate::core::types::Turn) {
        self.movement.end_turn(turn);
    }

    /// Damage `source` dealt to `target`, oldest first
    pub fn damage_history(&self, source: UnitId, target: UnitId) -> impl Iterator<Item = &DamageRecord> {
        self.damage_history.get(&(source, target)).into_iter().flatten()
    }

    /// Times `source` attached `effect`, oldest first
    pub fn control_history(&self, source: UnitId, effect: &str) -> impl Iterator<Item = &ControlRecord> {
        self.control_history
            .get(&(source, effect.to_string()))
            .into_iter()
            .flatten()
    }

    pub fn clear(&mut self) {
        self.damage_history.clear();
        self.control_history.clear();
        self.movement = MovementTracker::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ability::{Ability, DamageValue};
    use crate::board::battlefield::Battlefield;
    use crate::board::effects::ControlFlags;
    use crate::core::config::AnalyticsConfig;

    fn setup() -> (Battlefield, ProfileStore, EventRecorder) {
        let mut field = Battlefield::new(8, 8);
        let archer = Unit::new(1, "Archer", 0, HexCoord::new(2, 2)).with_ability(
            Ability::new("Ice Arrow")
                .with_range(3, None)
                .with_damage("frost", DamageValue::Flat(15.0))
                .with_effect("Target is frozen"),
        );
        field.add_unit(archer).unwrap();
        field.add_unit(Unit::new(2, "Brute", 1, HexCoord::new(3, 2))).unwrap();
        (
            field,
            ProfileStore::new(&AnalyticsConfig::default()),
            EventRecorder::new(AnalyticsConfig::default().history_capacity),
        )
    }

    fn damages(total: f32) -> BTreeMap<String, f32> {
        BTreeMap::from([("pierce".to_string(), total)])
    }

    #[test]
    fn test_basic_damage_snapshot() {
        let (field, mut store, mut recorder) = setup();
        let source = field.unit(UnitId(1)).unwrap();
        let target = field.unit(UnitId(2)).unwrap();
        let snap = recorder.record_damage(&mut store, &field, source, target, &damages(18.0), 3);

        assert_eq!(snap.threat_result, AbilityThreatResult::basic(18.0));
        assert_eq!(snap.target_id, UnitId(2));
        let profile = store.get(UnitId(1)).unwrap();
        assert_eq!(profile.total_damage_dealt(), 18.0);
        assert_eq!(recorder.damage_history(UnitId(1), UnitId(2)).count(), 1);
        assert!(store.get(UnitId(2)).is_none());
    }

    #[test]
    fn test_damage_uses_last_used_ability() {
        let (mut field, mut store, mut recorder) = setup();
        field.unit_mut(UnitId(1)).unwrap().abilities[0].used = true;
        let source = field.unit(UnitId(1)).unwrap();
        let target = field.unit(UnitId(2)).unwrap();
        let snap = recorder.record_damage(&mut store, &field, source, target, &damages(40.0), 3);

        assert_eq!(snap.threat_result.damage, 40.0);
        assert_eq!(snap.threat_result.range, 3);
        assert!(snap.threat_result.control_effects.contains(ControlFlags::FROZEN));
        assert!(snap.threat_result.control_context.is_some());
    }

    #[test]
    fn test_control_effect_merges_flags() {
        let (field, mut store, mut recorder) = setup();
        let source = field.unit(UnitId(1)).unwrap();
        let snap = recorder.record_control(
            &mut store,
            &field,
            source,
            "Dizzy",
            EffectTarget::Unit(UnitId(2)),
            4,
        );
        assert_eq!(snap.threat_result.control_effects, ControlFlags::DIZZY);
        assert_eq!(snap.threat_result.damage, 0.0);
        assert_eq!(snap.target_id, UnitId(2));

        let on_hex = recorder.record_control(
            &mut store,
            &field,
            source,
            "Trap",
            EffectTarget::Hex(HexCoord::new(5, 5)),
            5,
        );
        assert_eq!(on_hex.target_id, UnitId(1));
        assert!(on_hex.threat_result.control_context.is_none());

        let profile = store.get(UnitId(1)).unwrap();
        assert_eq!(profile.control_effects_applied().get("Dizzy"), Some(&1));
        assert_eq!(recorder.control_history(UnitId(1), "Trap").count(), 1);
    }

    #[test]
    fn test_summon_and_ability_use() {
        let (mut field, mut store, mut recorder) = setup();
        field.add_unit(Unit::new(3, "Gumble", 0, HexCoord::new(0, 0))).unwrap();
        let source = field.unit(UnitId(1)).unwrap();
        let summoned = field.unit(UnitId(3)).unwrap();

        let result = recorder.record_summon(&mut store, &field, source, summoned, "Ice Arrow");
        assert_eq!(result.range, 3);
        assert_eq!(result.summoned_unit.unwrap().unit_type, "Gumble");

        assert!(recorder
            .record_ability_use(&mut store, &field, source, "Missing", None)
            .is_none());
        let used = recorder
            .record_ability_use(&mut store, &field, source, "Ice Arrow", None)
            .unwrap();
        assert_eq!(used.damage, 15.0);
        let profile = store.get(UnitId(1)).unwrap();
        assert!(profile.abilities()["Ice Arrow"].summoned_unit.is_none());
        assert!(profile.history().is_empty());
    }

    #[test]
    fn test_raw_logs_are_bounded() {
        let (field, mut store, _) = setup();
        let mut recorder = EventRecorder::new(4);
        let source = field.unit(UnitId(1)).unwrap();
        let target = field.unit(UnitId(2)).unwrap();
        for t in 0..10 {
            recorder.record_damage(&mut store, &field, source, target, &damages(5.0), t);
            recorder.record_control(&mut store, &field, source, "Dizzy", EffectTarget::Unit(UnitId(2)), t);
        }

        assert_eq!(recorder.damage_history(UnitId(1), UnitId(2)).count(), 4);
        assert_eq!(recorder.control_history(UnitId(1), "Dizzy").count(), 4);
        let kept: Vec<Timestamp> = recorder
            .damage_history(UnitId(1), UnitId(2))
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(kept, vec![6, 7, 8, 9]);
        // the profile keeps its own, larger history
        assert_eq!(store.get(UnitId(1)).unwrap().history().len(), 20);
    }
}
