//! Scoring pipeline benchmarks
//!
//! - Pure score computation across event window sizes
//! - Engine recompute including in-memory I/O and persistence

use chrono::Utc;
use circulus_common::{Role, Trigger};
use circulus_reputation::{
    alerts::TracingAlertSink,
    engine::{EnginePorts, ReputationEngine},
    scoring::{compute_score, ScoreInputs, ScoringParams},
    sources::{FixtureGenerator, InMemoryDirectory, InMemoryEventLog, InMemoryMetricsSource},
    store::InMemoryScoreStore,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

fn bench_compute_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_score");
    group.measurement_time(Duration::from_secs(5));

    let params = ScoringParams::default();
    let now = Utc::now();
    let mut fixtures = FixtureGenerator::new(42);
    let metrics = fixtures.metrics(now);

    for window in [0usize, 10, 100, 1000] {
        let events = fixtures.events("ent-bench", window, now);
        group.throughput(Throughput::Elements(window.max(1) as u64));

        group.bench_with_input(BenchmarkId::new("events", window), &events, |b, events| {
            b.iter(|| {
                compute_score(
                    black_box(ScoreInputs {
                        entity_id: "ent-bench",
                        role: Role::Processor,
                        metrics: &metrics,
                        events,
                        now,
                    }),
                    &params,
                    Trigger::Scheduled,
                )
            });
        });
    }

    group.finish();
}

fn bench_engine_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Runtime::new().unwrap();

    let directory = Arc::new(InMemoryDirectory::new());
    let metrics = Arc::new(InMemoryMetricsSource::new());
    let events = Arc::new(InMemoryEventLog::new());
    let entities = runtime
        .block_on(FixtureGenerator::new(7).populate(50, &directory, &metrics, events.as_ref(), Utc::now()))
        .unwrap();

    let engine = ReputationEngine::new(
        ScoringParams::default(),
        EnginePorts {
            metrics,
            events,
            directory,
            store: Arc::new(InMemoryScoreStore::new()),
            alerts: Arc::new(TracingAlertSink),
        },
    )
    .unwrap();

    group.bench_function("recompute", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let entity = &entities[i % entities.len()];
            i += 1;
            runtime
                .block_on(engine.recompute(black_box(entity), Trigger::Manual))
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_compute_score, bench_engine_recompute);
criterion_main!(benches);
