//! Turn-scoped memoization of threat evaluations
//!
//! Entries are keyed by (source, target, ability, turn) and expire on turn
//! and ability boundaries rather than on wall-clock time, so clearing is
//! deterministic. `sweep` only bounds memory in very long turns.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{Turn, UnitId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub source: UnitId,
    pub target: UnitId,
    pub ability: String,
    pub turn: Turn,
}

impl CacheKey {
    pub fn new(source: UnitId, target: UnitId, ability: impl Into<String>, turn: Turn) -> Self {
        Self {
            source,
            target,
            ability: ability.into(),
            turn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub struct SnapshotCache<T> {
    entries: AHashMap<CacheKey, T>,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl<T> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl<T> SnapshotCache<T> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: AHashMap::new(),
            max_entries: max_entries.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<&T> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn get_or_insert_with<F: FnOnce() -> T>(&mut self, key: CacheKey, fill: F) -> &T {
        if self.entries.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        self.entries.entry(key).or_insert_with(fill)
    }

    /// Drop everything not computed on `turn`
    ///
    /// Entries from later turns go too, so rewinding the turn counter never
    /// serves evaluations from a board state that no longer exists.
    pub fn invalidate_turn(&mut self, turn: Turn) {
        let before = self.entries.len();
        self.entries.retain(|k, _| k.turn == turn);
        let dropped = before - self.entries.len();
        if dropped > 0 {
            tracing::trace!(turn, dropped, "Invalidated cached evaluations");
        }
    }

    /// Drop evaluations of one ability of one unit; its state just changed
    pub fn invalidate_ability(&mut self, source: UnitId, ability: &str) {
        self.entries
            .retain(|k, _| !(k.source == source && k.ability == ability));
    }

    /// Drop evaluations involving `unit` on either side
    pub fn invalidate_unit(&mut self, unit: UnitId) {
        self.entries
            .retain(|k, _| k.source != unit && k.target != unit);
    }

    /// Keep only the newest turn if the ceiling is exceeded, then clear
    /// outright if that is still not enough
    pub fn sweep(&mut self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        if let Some(newest) = self.entries.keys().map(|k| k.turn).max() {
            self.entries.retain(|k, _| k.turn == newest);
        }
        if self.entries.len() > self.max_entries {
            self.entries.clear();
        }
        tracing::debug!(entries = self.entries.len(), "Swept snapshot cache");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}
