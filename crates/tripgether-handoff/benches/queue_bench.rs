// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for share queue append/drain and legacy migration
// against the in-memory store.

use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use tripgether_bridge::{MemoryStore, SharedStore};
use tripgether_core::config::HandoffConfig;
use tripgether_core::types::ShareBatch;
use tripgether_handoff::ShareQueue;

fn batch(i: usize) -> ShareBatch {
    let items = (0..3)
        .map(|j| format!("https://example.com/place/{i}/{j}"))
        .collect();
    ShareBatch::new(items).expect("non-empty")
}

/// A queue already holding `len` batches.
fn filled_queue(len: usize) -> ShareQueue {
    let store = Arc::new(MemoryStore::new("group.bench"));
    let queue = ShareQueue::new(store, &HandoffConfig::default());
    for i in 0..len {
        queue.append(batch(i)).expect("append");
    }
    queue
}

fn bench_append_full_queue(c: &mut Criterion) {
    let queue = filled_queue(100);
    let mut i = 0;
    c.bench_function("append_at_bound_100", |b| {
        b.iter(|| {
            i += 1;
            black_box(queue.append(batch(i)).expect("append"));
        })
    });
}

fn bench_drain(c: &mut Criterion) {
    c.bench_function("drain_100_batches", |b| {
        b.iter_batched(
            || filled_queue(100),
            |queue| black_box(queue.drain().expect("drain")),
            BatchSize::SmallInput,
        )
    });
}

fn bench_migrate_legacy(c: &mut Criterion) {
    c.bench_function("migrate_legacy_into_50", |b| {
        b.iter_batched(
            || {
                let queue = filled_queue(50);
                queue
                    .store()
                    .set("ShareKey", json!(["t1", "t2", "t3"]))
                    .expect("seed legacy");
                queue
            },
            |queue| black_box(queue.migrate_legacy().expect("migrate")),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_append_full_queue, bench_drain, bench_migrate_legacy);
criterion_main!(benches);
