//! Benchmarks for event routing and pattern detection
//!
//! Run with: cargo bench --bench analytics_bench

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hex_threat_analytics::analysis::ability::AbilityThreatResult;
use hex_threat_analytics::analysis::pattern::PatternDetector;
use hex_threat_analytics::board::{Ability, Battlefield, ControlFlags, DamageValue, HexCoord, Unit};
use hex_threat_analytics::core::UnitId;
use hex_threat_analytics::profile::recorder::EffectTarget;
use hex_threat_analytics::{AnalyticsConfig, AnalyticsOrchestrator, GameEvent};

/// Two teams of `per_side` units facing each other across the board
fn battlefield(per_side: u32) -> Battlefield {
    let mut field = Battlefield::new(16, 16);
    for i in 0..per_side {
        let lancer = Unit::new(i + 1, "Frost Lancer", 0, HexCoord::new(3, i as i32 + 1)).with_ability(
            Ability::new("Ice Lance")
                .with_range(3, None)
                .with_damage("frost", DamageValue::Flat(18.0))
                .with_effect("Target is frozen"),
        );
        let brute = Unit::new(i + 101, "Brute", 1, HexCoord::new(6, i as i32 + 1))
            .with_ability(Ability::new("Smash").with_damage("crush", DamageValue::Flat(30.0)));
        field.add_unit(lancer).ok();
        field.add_unit(brute).ok();
    }
    field
}

fn event_stream(per_side: u32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for i in 0..per_side {
        let source = UnitId(i + 1);
        let target = UnitId(i + 101);
        events.push(GameEvent::AbilityUsed {
            source,
            ability: "Ice Lance".into(),
            target: Some(target),
        });
        events.push(GameEvent::Damage {
            source,
            target,
            damages: BTreeMap::from([("frost".to_string(), 18.0)]),
        });
        events.push(GameEvent::EffectAttach {
            source,
            effect: "Frozen".into(),
            target: EffectTarget::Unit(target),
        });
    }
    events
}

fn bench_event_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_routing");
    for per_side in [2u32, 6, 12] {
        let field = battlefield(per_side);
        let events = event_stream(per_side);
        group.bench_with_input(BenchmarkId::from_parameter(per_side), &events, |b, events| {
            b.iter(|| {
                let mut analytics = AnalyticsOrchestrator::new(AnalyticsConfig::default()).ok()?;
                for (i, event) in events.iter().enumerate() {
                    black_box(analytics.handle_event(&field, event, i as u64 * 50));
                }
                Some(analytics.get_patterns())
            })
        });
    }
    group.finish();
}

fn bench_decision_cycle(c: &mut Criterion) {
    let field = battlefield(6);
    c.bench_function("decision_cycle", |b| {
        let mut analytics = AnalyticsOrchestrator::new(AnalyticsConfig::default()).ok();
        b.iter(|| {
            if let Some(analytics) = analytics.as_mut() {
                black_box(analytics.run_decision_cycle(&field, UnitId(1), 0).ok());
                analytics.reset_weights();
            }
        })
    });
}

fn bench_pattern_detection(c: &mut Criterion) {
    let history: Vec<AbilityThreatResult> = (0..10)
        .map(|i| AbilityThreatResult {
            control_effects: if i % 2 == 0 {
                ControlFlags::FROZEN
            } else {
                ControlFlags::empty()
            },
            hexes_affected: 1 + i % 4,
            ..AbilityThreatResult::basic(if i % 2 == 0 { 0.0 } else { 12.0 + i as f32 * 4.0 })
        })
        .collect();
    let refs: Vec<&AbilityThreatResult> = history.iter().collect();
    let detector = PatternDetector::default();

    c.bench_function("pattern_detection", |b| {
        b.iter(|| detector.detect(black_box(&refs)))
    });
}

criterion_group!(benches, bench_event_routing, bench_decision_cycle, bench_pattern_detection);
criterion_main!(benches);
