//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Benchmarks for the leaderboard server

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use podium_board::{BoardEvent, BoardModel, Entry, LeaderboardSnapshot};
use podium_server::{
    FetchError, FrameSink, RankSource, Result, ServerMetrics, SessionPhase, SessionRegistry,
    WorkerConfig,
};
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

// Sink that discards every frame
struct NullSink;

#[async_trait]
impl FrameSink for NullSink {
    async fn send_frame(&self, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct StaticSource {
    snapshot: LeaderboardSnapshot,
}

#[async_trait]
impl RankSource for StaticSource {
    async fn fetch_ranked(&self) -> std::result::Result<LeaderboardSnapshot, FetchError> {
        Ok(self.snapshot.clone())
    }
}

fn standings(teams: usize) -> LeaderboardSnapshot {
    let entries = (0..teams)
        .map(|i| Entry::new(i as i64 + 1, format!("team-{i}"), 1000 - i as i64))
        .collect();
    LeaderboardSnapshot::new(entries, SystemTime::UNIX_EPOCH).unwrap()
}

fn bench_registry() -> SessionRegistry {
    let config = WorkerConfig {
        refresh_interval: Duration::from_secs(3600),
        write_timeout: Duration::from_secs(1),
        ..WorkerConfig::default()
    };
    SessionRegistry::new(config, Arc::new(ServerMetrics::new()))
}

// Benchmark metrics updates
fn bench_metrics_updates(c: &mut Criterion) {
    let metrics = Arc::new(ServerMetrics::new());

    c.bench_function("metrics_session_opened", |b| {
        b.iter(|| {
            metrics.session_opened();
            black_box(&metrics);
        });
    });

    c.bench_function("metrics_frame_sent", |b| {
        b.iter(|| {
            metrics.frame_sent();
            black_box(&metrics);
        });
    });

    c.bench_function("metrics_snapshot", |b| {
        b.iter(|| {
            let snapshot = metrics.snapshot();
            black_box(snapshot);
        });
    });
}

// Benchmark metrics snapshot with derived figures
fn bench_metrics_calculations(c: &mut Criterion) {
    let metrics = Arc::new(ServerMetrics::new());
    for _ in 0..100 {
        metrics.session_opened();
        metrics.frame_sent();
        metrics.refresh_succeeded();
    }

    c.bench_function("metrics_snapshot_with_calculations", |b| {
        b.iter(|| {
            let snapshot = metrics.snapshot();
            black_box(snapshot.refresh_failure_rate());
            black_box(snapshot.frames_per_second());
            black_box(snapshot.avg_session_duration());
        });
    });
}

// Benchmark session spawn and teardown
fn bench_session_churn(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("session_churn");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("spawn_quit_drain", |b| {
        b.to_async(&runtime).iter(|| async {
            let registry = bench_registry();
            let source = Arc::new(StaticSource {
                snapshot: standings(20),
            });

            let model = BoardModel::new(standings(20), 80, 24);
            let (_id, events) = registry.spawn_session(model, Box::new(NullSink), source, None);
            let _ = events.send(BoardEvent::Quit).await;
            let forced = registry.drain(Duration::from_secs(1)).await;
            black_box(forced);
        });
    });

    group.finish();
}

// Benchmark close broadcast with varying session counts
fn bench_broadcast_scaling(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("broadcast_scaling");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(15));

    for session_count in [10, 50, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(session_count),
            session_count,
            |b, &session_count| {
                b.to_async(&runtime).iter(|| async move {
                    let registry = bench_registry();
                    let source = Arc::new(StaticSource {
                        snapshot: standings(20),
                    });

                    // Senders must outlive the broadcast or the workers
                    // treat their peers as disconnected.
                    let mut senders = Vec::new();
                    for _ in 0..session_count {
                        let model = BoardModel::new(standings(20), 80, 24);
                        let (_id, events) = registry.spawn_session(
                            model,
                            Box::new(NullSink),
                            source.clone(),
                            None,
                        );
                        senders.push(events);
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;

                    let result = registry.broadcast_quit().await;
                    black_box(result);
                    let forced = registry.drain(Duration::from_secs(2)).await;
                    black_box((forced, senders));
                });
            },
        );
    }
    group.finish();
}

// Benchmark concurrent registry queries
fn bench_concurrent_registry_queries(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("concurrent_registry_queries", |b| {
        b.to_async(&runtime).iter(|| async {
            let registry = Arc::new(bench_registry());
            let source = Arc::new(StaticSource {
                snapshot: standings(20),
            });

            let mut senders = Vec::new();
            for _ in 0..10 {
                let model = BoardModel::new(standings(20), 80, 24);
                let (_id, events) =
                    registry.spawn_session(model, Box::new(NullSink), source.clone(), None);
                senders.push(events);
            }

            let mut handles = Vec::new();
            for _ in 0..100 {
                let registry = registry.clone();
                handles.push(tokio::spawn(async move {
                    let _count = registry.session_count();
                    let _ids = registry.session_ids();
                    let _infos = registry.session_infos();
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }

            registry.broadcast_quit().await;
            let forced = registry.drain(Duration::from_secs(2)).await;
            black_box((forced, senders));
        });
    });
}

// Benchmark phase transitions
fn bench_phase_transitions(c: &mut Criterion) {
    use std::sync::atomic::{AtomicU8, Ordering};

    let phase = AtomicU8::new(SessionPhase::Connecting.as_u8());

    c.bench_function("phase_transition", |b| {
        b.iter(|| {
            phase.store(SessionPhase::Active.as_u8(), Ordering::Release);
            let current = SessionPhase::from_u8(phase.load(Ordering::Acquire));
            black_box(current);
        });
    });
}

criterion_group!(
    benches,
    bench_metrics_updates,
    bench_metrics_calculations,
    bench_session_churn,
    bench_broadcast_scaling,
    bench_concurrent_registry_queries,
    bench_phase_transitions,
);

criterion_main!(benches);
