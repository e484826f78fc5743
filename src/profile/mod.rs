//! Per-unit threat profiles
//!
//! A profile is created lazily the first time a unit shows up in an event and
//! lives until the session ends. Snapshots are kept in a bounded ring; the
//! derived vulnerabilities and strengths are recomputed on every write.

pub mod movement;
pub mod recorder;
pub mod store;

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::analysis::ability::AbilityThreatResult;
use crate::board::unit::Unit;
use crate::core::types::{Timestamp, Turn, UnitId};

pub use movement::{MovementRecord, MovementStep, MovementTracker, PositionSampler};
pub use recorder::EventRecorder;
pub use store::ProfileStore;

/// One observation of what a unit did to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatSnapshot {
    pub timestamp: Timestamp,
    pub turn_number: Turn,
    pub round_number: u32,
    pub target_id: UnitId,
    pub source_id: UnitId,
    pub threat_result: AbilityThreatResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vulnerabilities {
    pub control_vulnerable: bool,
    pub damage_threatened: bool,
    pub positionally_weak: bool,
    pub resource_starved: bool,
}

impl Vulnerabilities {
    /// Human-readable list, always in control, damage, position, resource order
    pub fn describe(&self) -> Vec<&'static str> {
        [
            (self.control_vulnerable, "Vulnerable to control effects"),
            (self.damage_threatened, "Takes high damage"),
            (self.positionally_weak, "Poor positioning"),
            (self.resource_starved, "Resource management issues"),
        ]
        .into_iter()
        .filter_map(|(set, text)| set.then_some(text))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strengths {
    pub control_resistant: bool,
    /// Current over maximum health
    pub survival_rate: f32,
    pub positional_control: bool,
    pub resource_efficient: bool,
}

impl Default for Strengths {
    fn default() -> Self {
        Self {
            control_resistant: false,
            survival_rate: 1.0,
            positional_control: false,
            resource_efficient: false,
        }
    }
}

impl Strengths {
    pub fn describe(&self) -> Vec<&'static str> {
        [
            (self.control_resistant, "Resistant to control"),
            (self.survival_rate > 0.7, "High survival rate"),
            (self.positional_control, "Good positioning"),
            (self.resource_efficient, "Efficient resource use"),
        ]
        .into_iter()
        .filter_map(|(set, text)| set.then_some(text))
        .collect()
    }
}

/// Lifecycle of a unit as seen by the analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityState {
    /// No event has mentioned the unit yet
    Uninitialized,
    /// Events seen this turn
    Active,
    /// Known, but quiet this turn
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatProfile {
    pub unit_id: UnitId,
    pub unit_type: String,
    history: VecDeque<ThreatSnapshot>,
    history_capacity: usize,
    vulnerability_window: usize,
    vulnerabilities: Vulnerabilities,
    strengths: Strengths,
    abilities: BTreeMap<String, AbilityThreatResult>,
    total_damage_dealt: f32,
    damage_targets: BTreeMap<UnitId, f32>,
    control_effects_applied: BTreeMap<String, u32>,
    last_movement: Option<MovementRecord>,
    last_active_turn: Option<Turn>,
}

impl ThreatProfile {
    pub fn new(unit_id: UnitId, unit_type: impl Into<String>, history_capacity: usize, vulnerability_window: usize) -> Self {
        Self {
            unit_id,
            unit_type: unit_type.into(),
            history: VecDeque::new(),
            history_capacity: history_capacity.max(1),
            vulnerability_window: vulnerability_window.max(1),
            vulnerabilities: Vulnerabilities::default(),
            strengths: Strengths::default(),
            abilities: BTreeMap::new(),
            total_damage_dealt: 0.0,
            damage_targets: BTreeMap::new(),
            control_effects_applied: BTreeMap::new(),
            last_movement: None,
            last_active_turn: None,
        }
    }

    pub fn history(&self) -> &VecDeque<ThreatSnapshot> {
        &self.history
    }

    /// Newest `n` snapshots, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ThreatSnapshot> {
        self.history.iter().skip(self.history.len().saturating_sub(n))
    }

    /// Results of the newest `n` snapshots, oldest first
    pub fn recent_results(&self, n: usize) -> Vec<&AbilityThreatResult> {
        self.recent(n).map(|s| &s.threat_result).collect()
    }

    pub fn vulnerabilities(&self) -> Vulnerabilities {
        self.vulnerabilities
    }

    pub fn strengths(&self) -> Strengths {
        self.strengths
    }

    pub fn abilities(&self) -> &BTreeMap<String, AbilityThreatResult> {
        &self.abilities
    }

    pub fn total_damage_dealt(&self) -> f32 {
        self.total_damage_dealt
    }

    pub fn damage_targets(&self) -> &BTreeMap<UnitId, f32> {
        &self.damage_targets
    }

    pub fn control_effects_applied(&self) -> &BTreeMap<String, u32> {
        &self.control_effects_applied
    }

    pub fn last_movement(&self) -> Option<&MovementRecord> {
        self.last_movement.as_ref()
    }

    pub fn last_active_turn(&self) -> Option<Turn> {
        self.last_active_turn
    }

    pub(crate) fn mark_active(&mut self, turn: Turn) {
        self.last_active_turn = Some(turn);
    }

    /// Append a snapshot and fold it into the running totals
    ///
    /// `control_label` names the control effect that produced the snapshot;
    /// without one every set control flag is counted under its own name.
    pub(crate) fn push_snapshot(&mut self, snapshot: ThreatSnapshot, control_label: Option<&str>) {
        let result = &snapshot.threat_result;
        self.total_damage_dealt += result.damage;
        if result.damage > 0.0 {
            *self.damage_targets.entry(snapshot.target_id).or_insert(0.0) += result.damage;
        }
        match control_label {
            Some(label) => {
                *self.control_effects_applied.entry(label.to_string()).or_insert(0) += 1;
            }
            None => {
                for name in result.control_effects.names() {
                    *self.control_effects_applied.entry(name.to_lowercase()).or_insert(0) += 1;
                }
            }
        }

        self.history.push_back(snapshot);
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }

    pub(crate) fn set_ability(&mut self, title: impl Into<String>, result: AbilityThreatResult) {
        self.abilities.insert(title.into(), result);
    }

    pub(crate) fn set_last_movement(&mut self, record: MovementRecord) {
        self.last_movement = Some(record);
    }

    /// Recompute vulnerabilities and strengths from the newest snapshots
    ///
    /// Resource-based flags need the live unit; without it they keep their
    /// previous values.
    pub(crate) fn recompute(&mut self, unit: Option<&Unit>) {
        let window: Vec<&AbilityThreatResult> = self.recent_results(self.vulnerability_window);

        let controlled = window.iter().filter(|r| r.has_control()).count();
        let heavy = window.iter().filter(|r| r.damage > 20.0).count();
        let exposed = window
            .iter()
            .filter(|r| r.range > 2 && r.hexes_affected > 1)
            .count();

        self.vulnerabilities.control_vulnerable = controlled >= 2;
        self.vulnerabilities.damage_threatened = heavy >= 3;
        self.vulnerabilities.positionally_weak = exposed >= 2;

        self.strengths.control_resistant = controlled == 0;
        self.strengths.positional_control = self
            .abilities
            .values()
            .any(|r| r.range > 2 && r.hexes_affected > 2);

        if let Some(unit) = unit {
            let energy = unit.energy_ratio();
            let health = unit.health_ratio();
            self.vulnerabilities.resource_starved = energy < 0.3 || health < 0.4;
            self.strengths.survival_rate = health;
            self.strengths.resource_efficient = energy > 0.7 && health > 0.6;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::effects::ControlFlags;
    use crate::board::hex::HexCoord;

    fn snapshot(target: u32, result: AbilityThreatResult) -> ThreatSnapshot {
        ThreatSnapshot {
            timestamp: 0,
            turn_number: 1,
            round_number: 0,
            target_id: UnitId(target),
            source_id: UnitId(1),
            threat_result: result,
        }
    }

    fn frozen(damage: f32) -> AbilityThreatResult {
        AbilityThreatResult {
            control_effects: ControlFlags::FROZEN,
            ..AbilityThreatResult::basic(damage)
        }
    }

    #[test]
    fn test_history_is_a_ring() {
        let mut profile = ThreatProfile::new(UnitId(1), "Cyber Wolf", 3, 5);
        for i in 0..5 {
            profile.push_snapshot(snapshot(2, AbilityThreatResult::basic(i as f32)), None);
        }
        let damages: Vec<f32> = profile.history().iter().map(|s| s.threat_result.damage).collect();
        assert_eq!(damages, vec![2.0, 3.0, 4.0]);
        // totals cover everything ever recorded
        assert_eq!(profile.total_damage_dealt(), 10.0);
    }

    #[test]
    fn test_damage_targets_and_control_counts() {
        let mut profile = ThreatProfile::new(UnitId(1), "Snow Bunny", 200, 5);
        profile.push_snapshot(snapshot(2, AbilityThreatResult::basic(10.0)), None);
        profile.push_snapshot(snapshot(2, frozen(5.0)), None);
        profile.push_snapshot(snapshot(3, frozen(0.0)), Some("Frostbite"));
        assert_eq!(profile.damage_targets().get(&UnitId(2)), Some(&15.0));
        assert_eq!(profile.damage_targets().get(&UnitId(3)), None);
        assert_eq!(profile.control_effects_applied().get("frozen"), Some(&1));
        assert_eq!(profile.control_effects_applied().get("Frostbite"), Some(&1));
    }

    #[test]
    fn test_vulnerabilities_use_last_five() {
        let mut profile = ThreatProfile::new(UnitId(1), "Gumble", 200, 5);
        profile.push_snapshot(snapshot(2, frozen(0.0)), None);
        profile.push_snapshot(snapshot(2, frozen(0.0)), None);
        profile.recompute(None);
        assert!(profile.vulnerabilities().control_vulnerable);
        assert!(!profile.strengths().control_resistant);

        for _ in 0..4 {
            profile.push_snapshot(snapshot(2, AbilityThreatResult::basic(25.0)), None);
        }
        profile.recompute(None);
        assert!(!profile.vulnerabilities().control_vulnerable);
        assert!(profile.vulnerabilities().damage_threatened);
        assert_eq!(profile.vulnerabilities().describe(), vec!["Takes high damage"]);
    }

    #[test]
    fn test_positional_flags() {
        let mut profile = ThreatProfile::new(UnitId(1), "Golden Wyrm", 200, 5);
        let wide = AbilityThreatResult {
            range: 3,
            hexes_affected: 3,
            ..AbilityThreatResult::basic(0.0)
        };
        profile.push_snapshot(snapshot(2, wide.clone()), None);
        profile.push_snapshot(snapshot(2, wide.clone()), None);
        profile.set_ability("Breath", wide);
        profile.recompute(None);
        assert!(profile.vulnerabilities().positionally_weak);
        assert!(profile.strengths().positional_control);
    }

    #[test]
    fn test_resource_flags_need_unit() {
        let mut profile = ThreatProfile::new(UnitId(1), "Uncle Fungus", 200, 5);
        let mut unit = Unit::new(1, "Uncle Fungus", 0, HexCoord::new(0, 0));
        profile.recompute(Some(&unit));
        assert!(profile.strengths().resource_efficient);
        assert_eq!(
            profile.strengths().describe(),
            vec!["Resistant to control", "High survival rate", "Efficient resource use"]
        );

        unit.health = 30.0;
        profile.recompute(Some(&unit));
        assert!(profile.vulnerabilities().resource_starved);
        assert!((profile.strengths().survival_rate - 0.3).abs() < 1e-6);
        assert_eq!(
            profile.vulnerabilities().describe(),
            vec!["Resource management issues"]
        );
    }
}
