//! Headless Skirmish Replay
//!
//! Plays seeded random turns on a roster through the analytics engine and
//! prints profiles, detected patterns and the final decision weights.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use hex_threat_analytics::analysis::ability::valid_targets;
use hex_threat_analytics::analysis::pattern::ThreatPattern;
use hex_threat_analytics::board::{Battlefield, GameView, HexCoord};
use hex_threat_analytics::cache::CacheStats;
use hex_threat_analytics::core::{Timestamp, UnitId};
use hex_threat_analytics::profile::recorder::EffectTarget;
use hex_threat_analytics::weights::decision::{DecisionWeights, WeightAnalytics};
use hex_threat_analytics::{AnalysisResult, AnalyticsConfig, AnalyticsOrchestrator, GameEvent};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Headless skirmish replay through the threat analytics
#[derive(Parser, Debug)]
#[command(name = "skirmish_replay")]
#[command(about = "Replay seeded random skirmish turns and report threat analytics")]
struct Args {
    /// Roster file (JSON)
    #[arg(long, default_value = "data/roster.json")]
    roster: PathBuf,

    /// Analytics configuration (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of turns to play
    #[arg(long, default_value_t = 16)]
    turns: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Log every routed event
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Serialize)]
struct ProfileSummary {
    unit_id: UnitId,
    unit_type: String,
    snapshots: usize,
    total_damage: f32,
    vulnerabilities: Vec<String>,
    strengths: Vec<String>,
}

#[derive(Serialize)]
struct ReplayReport {
    session: String,
    seed: u64,
    turns: u32,
    profiles: Vec<ProfileSummary>,
    patterns: Vec<ThreatPattern>,
    decisions: Vec<AnalysisResult>,
    weights: DecisionWeights,
    weight_analytics: WeightAnalytics,
    cache: CacheStats,
}

/// Timestamps advance a second per turn and one sample interval per step
fn timestamp(turn: u32, step: u64, interval_ms: u64) -> Timestamp {
    turn as u64 * 1000 + step * interval_ms
}

/// Free neighbor of `from` closest to `goal`, if it gets closer
fn step_towards(field: &Battlefield, unit: UnitId, from: HexCoord, goal: HexCoord) -> Option<HexCoord> {
    from.neighbors()
        .into_iter()
        .filter(|h| field.in_bounds(*h) && !field.is_hazard(*h))
        .filter(|h| field.unit_at(*h).map_or(true, |u| u.id == unit))
        .filter(|h| h.distance(&goal) < from.distance(&goal))
        .min_by_key(|h| h.distance(&goal))
}

fn play_turn(
    field: &mut Battlefield,
    analytics: &mut AnalyticsOrchestrator,
    active: UnitId,
    rng: &mut StdRng,
    decisions: &mut Vec<AnalysisResult>,
) {
    let turn = field.turn();
    let interval = analytics.config().movement_sample_interval_ms;
    let mut clock: u64 = 0;

    analytics.handle_event(&*field, &GameEvent::Activate { unit: active }, timestamp(turn, clock, interval));
    match analytics.run_decision_cycle(&*field, active, timestamp(turn, clock, interval)) {
        Ok(result) => decisions.push(result),
        Err(e) => tracing::warn!(unit = %active, error = %e, "Decision cycle failed"),
    }

    let Some(unit) = field.unit(active).cloned() else {
        return;
    };
    let Some(enemy) = field
        .living_units()
        .into_iter()
        .filter(|u| u.team != unit.team)
        .min_by_key(|u| unit.distance_to(u))
        .cloned()
    else {
        return;
    };

    // Close in, reported either step by step or as one finished move
    let start = unit.position;
    let mut position = start;
    let granular = rng.gen_bool(0.5);
    for _ in 0..unit.stats.movement {
        if position.distance(&enemy.position) <= 1 {
            break;
        }
        let Some(next) = step_towards(field, active, position, enemy.position) else {
            break;
        };
        if field.move_unit(active, next).is_err() {
            break;
        }
        clock += 1;
        if granular {
            let event = GameEvent::MovementStep {
                unit: active,
                from: position,
                to: next,
            };
            analytics.handle_event(&*field, &event, timestamp(turn, clock, interval));
        }
        position = next;
    }
    if !granular && position != start {
        let event = GameEvent::MovementComplete {
            unit: active,
            from: start,
            to: position,
        };
        analytics.handle_event(&*field, &event, timestamp(turn, clock, interval));
    }

    // Use a random affordable ability on a random valid target
    let Some(unit) = field.unit(active).cloned() else {
        return;
    };
    let usable: Vec<_> = unit.usable_abilities().cloned().collect();
    let Some(ability) = usable.choose(rng) else {
        return;
    };
    let targets: Vec<UnitId> = valid_targets(&*field, &unit, ability)
        .into_iter()
        .map(|t| t.id)
        .collect();
    let Some(target) = targets.choose(rng).copied() else {
        return;
    };

    if let Some(caster) = field.unit_mut(active) {
        caster.energy = (caster.energy - ability.costs.energy).max(0.0);
        caster.endurance = (caster.endurance - 5.0).max(0.0);
        if let Some(a) = caster.ability_mut(&ability.title) {
            a.used = true;
        }
    }
    clock += 1;
    let used = GameEvent::AbilityUsed {
        source: active,
        ability: ability.title.clone(),
        target: Some(target),
    };
    analytics.handle_event(&*field, &used, timestamp(turn, clock, interval));

    let damages: BTreeMap<String, f32> = ability
        .damages
        .iter()
        .map(|(k, v)| (k.clone(), v.amount()))
        .filter(|(_, v)| *v > 0.0)
        .collect();
    if !damages.is_empty() {
        let total: f32 = damages.values().sum();
        if let Err(e) = field.apply_damage(target, total) {
            tracing::warn!(unit = %target, error = %e, "Failed to apply damage");
        }
        clock += 1;
        let hit = GameEvent::Damage {
            source: active,
            target,
            damages,
        };
        analytics.handle_event(&*field, &hit, timestamp(turn, clock, interval));
    }

    if !ability.control().is_empty() {
        for effect in &ability.effects {
            if let Some(t) = field.unit_mut(target) {
                t.add_status_effect(effect.clone());
            }
            clock += 1;
            let attach = GameEvent::EffectAttach {
                source: active,
                effect: effect.clone(),
                target: EffectTarget::Unit(target),
            };
            analytics.handle_event(&*field, &attach, timestamp(turn, clock, interval));
        }
    }
}

fn print_text(report: &ReplayReport) {
    println!("Session {} (seed {}, {} turns)", report.session, report.seed, report.turns);
    for profile in &report.profiles {
        println!(
            "  {} {}: {} snapshots, {:.1} damage dealt",
            profile.unit_id, profile.unit_type, profile.snapshots, profile.total_damage
        );
        for v in &profile.vulnerabilities {
            println!("    - {}", v);
        }
        for s in &profile.strengths {
            println!("    + {}", s);
        }
    }
    println!("Patterns:");
    for pattern in &report.patterns {
        println!(
            "  {} (frequency {:.2}, effectiveness {:.2})",
            pattern.pattern, pattern.frequency, pattern.effectiveness
        );
    }
    println!(
        "Weights: tactical balance {:.3}, strategic balance {:.3}",
        report.weight_analytics.tactical_balance, report.weight_analytics.strategic_balance
    );
    println!(
        "Cache: {} entries, {} hits, {} misses",
        report.cache.entries, report.cache.hits, report.cache.misses
    );
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "hex_threat_analytics=debug"
    } else {
        "hex_threat_analytics=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    let config = match &args.config {
        Some(path) => AnalyticsConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config '{}': {}", path.display(), e);
            eprintln!("Using default configuration");
            AnalyticsConfig::default()
        }),
        None => AnalyticsConfig::default(),
    };

    let mut field = match Battlefield::load_roster(&args.roster) {
        Ok(field) => field,
        Err(e) => {
            eprintln!("Error: Failed to load roster '{}': {}", args.roster.display(), e);
            std::process::exit(1);
        }
    };

    let mut analytics = match AnalyticsOrchestrator::new(config) {
        Ok(analytics) => analytics,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut decisions = Vec::new();
    let mut played = 0;
    for _ in 0..args.turns {
        let Some(active) = field.advance_turn() else {
            break;
        };
        play_turn(&mut field, &mut analytics, active, &mut rng, &mut decisions);
        played += 1;

        let teams_alive = field
            .teams()
            .into_iter()
            .filter(|team| field.living_units().iter().any(|u| u.team == *team))
            .count();
        if teams_alive < 2 {
            tracing::info!(turn = field.turn(), "One team left standing");
            break;
        }
    }

    let profiles = analytics
        .profiles()
        .iter()
        .map(|p| ProfileSummary {
            unit_id: p.unit_id,
            unit_type: p.unit_type.clone(),
            snapshots: p.history().len(),
            total_damage: p.total_damage_dealt(),
            vulnerabilities: analytics.get_vulnerabilities(p.unit_id),
            strengths: analytics.get_strengths(p.unit_id),
        })
        .collect();

    let report = ReplayReport {
        session: analytics.session().to_string(),
        seed,
        turns: played,
        profiles,
        patterns: analytics.get_patterns(),
        decisions,
        weights: *analytics.weights().current(),
        weight_analytics: analytics.weights().analytics(),
        cache: analytics.cache_stats(),
    };

    if args.format == "text" {
        print_text(&report);
    } else {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: Failed to serialize report: {}", e);
                std::process::exit(1);
            }
        }
    }
}
