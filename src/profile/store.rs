//! Owned registry of threat profiles

use ahash::AHashMap;

use crate::board::unit::Unit;
use crate::core::config::AnalyticsConfig;
use crate::core::types::{Turn, UnitId};
use crate::profile::{ActivityState, ThreatProfile, ThreatSnapshot};

/// All profiles of one session
///
/// Writes go through the event recorder, which recomputes the derived flags
/// of every profile it touches.
#[derive(Debug)]
pub struct ProfileStore {
    profiles: AHashMap<UnitId, ThreatProfile>,
    history_capacity: usize,
    vulnerability_window: usize,
}

impl ProfileStore {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            profiles: AHashMap::new(),
            history_capacity: config.history_capacity,
            vulnerability_window: config.vulnerability_window,
        }
    }

    pub fn get(&self, id: UnitId) -> Option<&ThreatProfile> {
        self.profiles.get(&id)
    }

    /// The unit's profile, created on first use
    pub(crate) fn ensure(&mut self, unit: &Unit) -> &mut ThreatProfile {
        let (capacity, window) = (self.history_capacity, self.vulnerability_window);
        self.profiles.entry(unit.id).or_insert_with(|| {
            tracing::debug!(unit = %unit.id, unit_type = %unit.name, "Creating threat profile");
            ThreatProfile::new(unit.id, unit.name.clone(), capacity, window)
        })
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut ThreatProfile> {
        self.profiles.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles in unit id order
    pub fn iter(&self) -> impl Iterator<Item = &ThreatProfile> {
        let mut ids: Vec<&UnitId> = self.profiles.keys().collect();
        ids.sort();
        ids.into_iter().filter_map(move |id| self.profiles.get(id))
    }

    pub fn activity(&self, id: UnitId, turn: Turn) -> ActivityState {
        match self.profiles.get(&id) {
            None => ActivityState::Uninitialized,
            Some(p) if p.last_active_turn() == Some(turn) => ActivityState::Active,
            Some(_) => ActivityState::Idle,
        }
    }

    /// Newest `limit` snapshots, across all profiles, that targeted `target`
    pub fn recent_threats_to(&self, target: UnitId, limit: usize) -> Vec<&ThreatSnapshot> {
        let mut hits: Vec<&ThreatSnapshot> = self
            .profiles
            .values()
            .flat_map(|p| p.history().iter())
            .filter(|s| s.target_id == target && s.source_id != target)
            .collect();
        hits.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(b.turn_number.cmp(&a.turn_number))
                .then(a.source_id.cmp(&b.source_id))
        });
        hits.truncate(limit);
        hits
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ability::AbilityThreatResult;
    use crate::board::hex::HexCoord;

    fn snap(source: u32, target: u32, timestamp: u64) -> ThreatSnapshot {
        ThreatSnapshot {
            timestamp,
            turn_number: 0,
            round_number: 0,
            target_id: UnitId(target),
            source_id: UnitId(source),
            threat_result: AbilityThreatResult::basic(1.0),
        }
    }

    #[test]
    fn test_lazy_creation_and_activity() {
        let mut store = ProfileStore::new(&AnalyticsConfig::default());
        let unit = Unit::new(7, "Nutcase", 0, HexCoord::new(0, 0));
        assert_eq!(store.activity(UnitId(7), 1), ActivityState::Uninitialized);
        store.ensure(&unit).mark_active(1);
        assert_eq!(store.activity(UnitId(7), 1), ActivityState::Active);
        assert_eq!(store.activity(UnitId(7), 2), ActivityState::Idle);
        assert_eq!(store.get(UnitId(7)).unwrap().unit_type, "Nutcase");
    }

    #[test]
    fn test_recent_threats_across_profiles() {
        let mut store = ProfileStore::new(&AnalyticsConfig::default());
        let a = Unit::new(1, "A", 0, HexCoord::new(0, 0));
        let b = Unit::new(2, "B", 0, HexCoord::new(1, 0));
        store.ensure(&a).push_snapshot(snap(1, 9, 10), None);
        store.ensure(&a).push_snapshot(snap(1, 8, 11), None);
        store.ensure(&b).push_snapshot(snap(2, 9, 12), None);
        store.ensure(&b).push_snapshot(snap(2, 9, 5), None);

        let threats = store.recent_threats_to(UnitId(9), 2);
        let stamps: Vec<u64> = threats.iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![12, 10]);
    }

    #[test]
    fn test_iter_is_ordered() {
        let mut store = ProfileStore::new(&AnalyticsConfig::default());
        for id in [5, 2, 9] {
            store.ensure(&Unit::new(id, "X", 0, HexCoord::new(0, 0)));
        }
        let ids: Vec<UnitId> = store.iter().map(|p| p.unit_id).collect();
        assert_eq!(ids, vec![UnitId(2), UnitId(5), UnitId(9)]);
    }
}
