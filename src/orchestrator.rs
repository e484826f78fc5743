//! Analytics orchestrator
//!
//! The single entry point of the engine. Game events are routed to the event
//! recorder, threat evaluations are memoized for the current turn, and the
//! decision cycle folds every analyzer into one `AnalysisResult` that feeds
//! the decision weights.
//!
//! Events that reference units or abilities the game view cannot resolve
//! are dropped with a warning; handling an event never fails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::ability::AbilityThreatResult;
use crate::analysis::pattern::{PatternDetector, PatternKind, ThreatPattern};
use crate::analysis::position::{evaluate_movement, MovementEvaluation, Placement, PositionAnalyzer};
use crate::analysis::resource::ResourceAnalyzer;
use crate::analysis::threat::{assess, prioritize, threat_candidates, ThreatAssessment};
use crate::board::ability::Ability;
use crate::board::hex::HexCoord;
use crate::board::unit::Unit;
use crate::board::view::GameView;
use crate::cache::{CacheKey, CacheStats, SnapshotCache};
use crate::core::config::AnalyticsConfig;
use crate::core::error::{AnalyticsError, Result};
use crate::core::types::{clamp01, SessionId, Timestamp, Turn, UnitId};
use crate::events::GameEvent;
use crate::profile::movement::{MovementRecord, PositionSampler};
use crate::profile::recorder::{EffectTarget, EventRecorder};
use crate::profile::store::ProfileStore;
use crate::profile::{ActivityState, ThreatProfile, ThreatSnapshot, Vulnerabilities};
use crate::weights::decision::WeightSystem;
use crate::weights::feedback::{FeedbackInputs, WeightFeedbackLoop, WeightModifiers};

/// What handling one event produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventOutcome {
    /// A snapshot was appended to the actor's history
    Snapshot {
        snapshot: ThreatSnapshot,
        threat: Option<ThreatAssessment>,
    },
    /// An ability was analyzed and stored on the actor's profile
    Ability {
        title: String,
        result: AbilityThreatResult,
        threat: Option<ThreatAssessment>,
    },
    Movement {
        record: MovementRecord,
        evaluation: Option<MovementEvaluation>,
    },
    Activated { unit: UnitId, position: HexCoord },
}

/// Aggregate output of one decision cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub unit_id: UnitId,
    pub turn: Turn,
    pub threat_level: f32,
    pub position_quality: f32,
    pub resource_efficiency: f32,
    pub pattern_confidence: f32,
    pub weight_modifiers: WeightModifiers,
}

pub struct AnalyticsOrchestrator {
    session: SessionId,
    config: AnalyticsConfig,
    store: ProfileStore,
    recorder: EventRecorder,
    detector: PatternDetector,
    positions: PositionAnalyzer,
    resources: ResourceAnalyzer,
    sampler: PositionSampler,
    cache: SnapshotCache<ThreatAssessment>,
    weights: WeightSystem,
    feedback: WeightFeedbackLoop,
    current_turn: Option<Turn>,
}

impl AnalyticsOrchestrator {
    /// Create an orchestrator; the config is validated first
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        config.validate().map_err(AnalyticsError::InvalidConfig)?;
        let session = SessionId::new();
        tracing::info!(session = %session, "Starting analytics session");
        Ok(Self {
            session,
            store: ProfileStore::new(&config),
            recorder: EventRecorder::new(config.history_capacity),
            detector: PatternDetector::new(config.pattern_window, config.pattern_frequency_threshold),
            positions: PositionAnalyzer::new(),
            resources: ResourceAnalyzer::new(config.resource_history_len),
            sampler: PositionSampler::new(config.movement_sample_interval_ms),
            cache: SnapshotCache::new(config.cache_max_entries),
            weights: WeightSystem::new(config.situational_weight_ceiling),
            feedback: WeightFeedbackLoop::from_config(&config),
            current_turn: None,
            config,
        })
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Route one event; None when nothing was recorded
    pub fn handle_event<V: GameView + ?Sized>(
        &mut self,
        view: &V,
        event: &GameEvent,
        timestamp: Timestamp,
    ) -> Option<EventOutcome> {
        self.sync_turn(view.turn());
        tracing::debug!(
            session = %self.session,
            event = event.kind(),
            unit = %event.actor(),
            turn = view.turn(),
            "Routing event"
        );

        let outcome = self.route(view, event, timestamp);
        self.cache.sweep();
        match outcome {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(event = event.kind(), error = %e, "Dropped event");
                None
            }
        }
    }

    /// Feed a polled position; emits a movement step once the sampler sees
    /// the unit change hex
    pub fn sample_position<V: GameView + ?Sized>(
        &mut self,
        view: &V,
        unit_id: UnitId,
        at: Timestamp,
    ) -> Option<EventOutcome> {
        let position = view.unit(unit_id)?.position;
        let step = self.sampler.sample(unit_id, at, position)?;
        self.handle_event(
            view,
            &GameEvent::MovementStep {
                unit: step.unit_id,
                from: step.from,
                to: step.to,
            },
            at,
        )
    }

    fn sync_turn(&mut self, turn: Turn) {
        if self.current_turn != Some(turn) {
            self.cache.invalidate_turn(turn);
            self.recorder.end_turn(turn);
            self.current_turn = Some(turn);
        }
    }

    fn route<V: GameView + ?Sized>(
        &mut self,
        view: &V,
        event: &GameEvent,
        timestamp: Timestamp,
    ) -> Result<EventOutcome> {
        match event {
            GameEvent::AbilityUsed {
                source,
                ability,
                target,
            } => {
                let source = resolve(view, *source)?;
                let target = target.map(|id| resolve(view, id)).transpose()?;
                let used = source.ability(ability).ok_or_else(|| AnalyticsError::AbilityNotFound {
                    unit: source.id,
                    ability: ability.clone(),
                })?;

                let threat = target.map(|t| self.cached_assess(view, source, used, t));
                let result = self
                    .recorder
                    .record_ability_use(&mut self.store, view, source, ability, target)
                    .ok_or_else(|| AnalyticsError::AbilityNotFound {
                        unit: source.id,
                        ability: ability.clone(),
                    })?;
                self.cache.invalidate_ability(source.id, ability);

                Ok(EventOutcome::Ability {
                    title: ability.clone(),
                    result,
                    threat,
                })
            }
            GameEvent::Damage {
                source,
                target,
                damages,
            } => {
                let source = resolve(view, *source)?;
                let target = resolve(view, *target)?;
                let threat = source
                    .last_used_ability()
                    .map(|a| self.cached_assess(view, source, a, target));
                let snapshot = self
                    .recorder
                    .record_damage(&mut self.store, view, source, target, damages, timestamp);
                self.cache.invalidate_unit(target.id);
                Ok(EventOutcome::Snapshot { snapshot, threat })
            }
            GameEvent::EffectAttach {
                source,
                effect,
                target,
            } => {
                let source = resolve(view, *source)?;
                if let EffectTarget::Unit(id) = target {
                    resolve(view, *id)?;
                    self.cache.invalidate_unit(*id);
                }
                let snapshot = self
                    .recorder
                    .record_control(&mut self.store, view, source, effect, *target, timestamp);
                Ok(EventOutcome::Snapshot {
                    snapshot,
                    threat: None,
                })
            }
            GameEvent::Activate { unit } => {
                let unit = resolve(view, *unit)?;
                self.positions.track_activation(unit);
                let profile = self.store.ensure(unit);
                profile.mark_active(view.turn());
                profile.recompute(Some(unit));
                tracing::info!(unit = %unit.id, position = %unit.position, "Unit activated");
                Ok(EventOutcome::Activated {
                    unit: unit.id,
                    position: unit.position,
                })
            }
            GameEvent::Summon {
                summoner,
                summoned,
                ability,
            } => {
                let summoner = resolve(view, *summoner)?;
                let summoned = resolve(view, *summoned)?;
                let result = self
                    .recorder
                    .record_summon(&mut self.store, view, summoner, summoned, ability);
                Ok(EventOutcome::Ability {
                    title: ability.clone(),
                    result,
                    threat: None,
                })
            }
            GameEvent::MovementStep { unit, from, to } => {
                let unit = resolve(view, *unit)?;
                let record = self
                    .recorder
                    .record_movement(&mut self.store, view, unit, *from, *to);
                self.cache.invalidate_unit(unit.id);
                Ok(EventOutcome::Movement {
                    record,
                    evaluation: None,
                })
            }
            GameEvent::MovementComplete { unit, from, to } => {
                let unit = resolve(view, *unit)?;
                let record = self
                    .recorder
                    .record_movement(&mut self.store, view, unit, *from, *to);
                self.cache.invalidate_unit(unit.id);

                let start = self.positions.start_position(unit.id).unwrap_or(record.from);
                let evaluation = evaluate_movement(view, unit, start, record.to);
                tracing::debug!(
                    unit = %unit.id,
                    improvement = evaluation.improvement,
                    "Evaluated movement"
                );
                Ok(EventOutcome::Movement {
                    record,
                    evaluation: Some(evaluation),
                })
            }
        }
    }

    fn cached_assess<V: GameView + ?Sized>(
        &mut self,
        view: &V,
        source: &Unit,
        ability: &Ability,
        target: &Unit,
    ) -> ThreatAssessment {
        let key = CacheKey::new(source.id, target.id, ability.title.clone(), view.turn());
        self.cache
            .get_or_insert_with(key, || assess(view, source, ability, target))
            .clone()
    }

    /// Threats every reachable enemy ability poses to `target`, memoized for
    /// the current turn
    pub fn threats_to<V: GameView + ?Sized>(&mut self, view: &V, target: UnitId) -> Result<Vec<ThreatAssessment>> {
        self.sync_turn(view.turn());
        let target = resolve(view, target)?;
        let mut threats: Vec<ThreatAssessment> = threat_candidates(view, target)
            .into_iter()
            .map(|(enemy, ability)| self.cached_assess(view, enemy, ability, target))
            .collect();
        prioritize(&mut threats);
        self.cache.sweep();
        Ok(threats)
    }

    /// Analyze `unit_id`'s situation and feed the result into the weights
    ///
    /// Modifiers compound across cycles until `reset_weights`.
    pub fn run_decision_cycle<V: GameView + ?Sized>(
        &mut self,
        view: &V,
        unit_id: UnitId,
        timestamp: Timestamp,
    ) -> Result<AnalysisResult> {
        let threats = self.threats_to(view, unit_id)?;
        let unit = resolve(view, unit_id)?;

        let quality = Placement::current(view, unit).quality();
        let resources = self.resources.analyze(view, unit, timestamp);
        let patterns = self.get_threat_patterns(unit_id);

        let pattern_confidence = if patterns.is_empty() {
            0.0
        } else {
            (patterns.iter().map(|p| p.frequency).sum::<f32>() / patterns.len() as f32).min(1.0)
        };

        let inputs = FeedbackInputs {
            threat_level: threats.first().map_or(0.0, |t| clamp01(t.threat_level)),
            position_quality: clamp01(quality.value),
            resource_efficiency: resources.efficiency.overall(),
            pattern_confidence,
            position_control: quality.factors.control,
            energy_regeneration: resources.efficiency.energy.regeneration,
            will_kill: threats.first().is_some_and(|t| t.details.will_kill),
            unsafe_position: quality.factors.safety < 0.3,
            fatigue_danger: resources.efficiency.endurance.risk > 0.7,
        };
        let modifiers = self.feedback.modifiers(&inputs);
        self.feedback.apply(&mut self.weights, &modifiers);

        let result = AnalysisResult {
            unit_id,
            turn: view.turn(),
            threat_level: inputs.threat_level,
            position_quality: inputs.position_quality,
            resource_efficiency: inputs.resource_efficiency,
            pattern_confidence,
            weight_modifiers: modifiers,
        };
        tracing::info!(
            unit = %unit_id,
            threat = result.threat_level,
            position = result.position_quality,
            resources = result.resource_efficiency,
            patterns = result.pattern_confidence,
            "Decision cycle complete"
        );
        Ok(result)
    }

    pub fn get_profile(&self, unit_id: UnitId) -> Option<&ThreatProfile> {
        self.store.get(unit_id)
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.store
    }

    /// Human-readable vulnerabilities in fixed order; empty for unknown units
    pub fn get_vulnerabilities(&self, unit_id: UnitId) -> Vec<String> {
        self.store
            .get(unit_id)
            .map_or_else(Vulnerabilities::default, |p| p.vulnerabilities())
            .describe()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Human-readable strengths; empty for unknown units
    pub fn get_strengths(&self, unit_id: UnitId) -> Vec<String> {
        self.store
            .get(unit_id)
            .map(|p| p.strengths().describe().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Patterns in one unit's recent history
    pub fn get_threat_patterns(&self, unit_id: UnitId) -> Vec<ThreatPattern> {
        let Some(profile) = self.store.get(unit_id) else {
            return Vec::new();
        };
        let patterns = self
            .detector
            .detect(&profile.recent_results(self.detector.window));
        if !patterns.is_empty() {
            tracing::debug!(
                unit = %unit_id,
                patterns = ?patterns.iter().map(|p| p.pattern.name()).collect::<Vec<_>>(),
                "Detected threat patterns"
            );
        }
        patterns
    }

    /// Patterns across all units, one per kind, keeping the most frequent
    pub fn get_patterns(&self) -> Vec<ThreatPattern> {
        let mut best: BTreeMap<PatternKind, ThreatPattern> = BTreeMap::new();
        for profile in self.store.iter() {
            for pattern in self.get_threat_patterns(profile.unit_id) {
                match best.get(&pattern.pattern) {
                    Some(existing) if existing.frequency >= pattern.frequency => {}
                    _ => {
                        best.insert(pattern.pattern, pattern);
                    }
                }
            }
        }
        best.into_values().collect()
    }

    /// Newest `limit` snapshots in which `unit_id` was the target
    pub fn get_recent_threats(&self, unit_id: UnitId, limit: usize) -> Vec<&ThreatSnapshot> {
        self.store.recent_threats_to(unit_id, limit)
    }

    pub fn activity(&self, unit_id: UnitId, turn: Turn) -> ActivityState {
        self.store.activity(unit_id, turn)
    }

    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    pub fn resources(&self) -> &ResourceAnalyzer {
        &self.resources
    }

    pub fn weights(&self) -> &WeightSystem {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut WeightSystem {
        &mut self.weights
    }

    pub fn reset_weights(&mut self) {
        self.weights.reset();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all session state; weights return to base
    pub fn clear(&mut self) {
        self.store.clear();
        self.recorder.clear();
        self.resources.clear();
        self.cache.clear();
        self.weights.reset();
        self.positions = PositionAnalyzer::new();
        self.current_turn = None;
        tracing::info!(session = %self.session, "Cleared analytics session");
    }
}

fn resolve<V: GameView + ?Sized>(view: &V, id: UnitId) -> Result<&Unit> {
    view.unit(id).ok_or(AnalyticsError::UnitNotFound(id))
}
