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

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use podium_board::{
    BoardEvent, BoardModel, Direction, Entry, KeyDecoder, LeaderboardSnapshot, render_frame,
};
use std::hint::black_box;
use std::time::SystemTime;

fn snapshot_with_rows(rows: usize) -> LeaderboardSnapshot {
    let entries = (1..=rows as i64)
        .map(|rank| Entry::new(rank, format!("Team{rank:04}"), 100_000 - rank))
        .collect();
    LeaderboardSnapshot::new(entries, SystemTime::UNIX_EPOCH)
        .expect("generated rows are strictly ranked")
}

// ===== Frame Rendering Benchmarks =====

fn bench_render_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");

    for rows in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, &rows| {
            let model = BoardModel::new(snapshot_with_rows(rows), 96, 24);
            b.iter(|| {
                let frame = render_frame(black_box(&model));
                black_box(frame);
            });
        });
    }

    group.finish();
}

// ===== State Machine Benchmarks =====

fn bench_update_tick(c: &mut Criterion) {
    c.bench_function("update_tick_swap", |b| {
        let mut model = BoardModel::new(snapshot_with_rows(100), 96, 24);
        b.iter(|| {
            let effects = model.update(BoardEvent::Tick(Some(black_box(snapshot_with_rows(100)))));
            black_box(effects);
        });
    });

    c.bench_function("update_navigate", |b| {
        let mut model = BoardModel::new(snapshot_with_rows(100), 96, 24);
        b.iter(|| {
            let effects = model.update(BoardEvent::Navigate(black_box(Direction::Down)));
            black_box(effects);
        });
    });
}

// ===== Key Decoding Benchmarks =====

fn bench_key_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_decoding");

    let keystrokes: Vec<u8> = b"jjjkk\x1b[A\x1b[B\x1bOAq".to_vec();
    group.throughput(Throughput::Bytes(keystrokes.len() as u64));
    group.bench_function("interactive_burst", |b| {
        b.iter(|| {
            let mut decoder = KeyDecoder::new();
            let events = decoder.feed(black_box(&keystrokes));
            black_box(events);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_render_frame,
    bench_update_tick,
    bench_key_decoding
);
criterion_main!(benches);
