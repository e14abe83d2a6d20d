//! # Aggregation Benchmarks
//!
//! Performance benchmarks for the tally-core aggregator.
//!
//! Run with: `cargo bench -p tally-core`

use chrono::{Duration, NaiveDate};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tally_core::primitives::TOP_N_USERS;
use tally_core::{
    Action, Aggregator, InteractionId, InteractionRecord, InteractionTable, ProductId, UserId,
};

/// Create a table of `size` interactions spread over 100 users, 50 products
/// and 31 days, without randomness.
fn create_table(size: usize) -> InteractionTable {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid base time");

    (0..size as i64)
        .map(|i| {
            InteractionRecord::new(
                InteractionId(i + 1),
                UserId(i * 7 % 100 + 1),
                ProductId(i * 13 % 50 + 1),
                Action::ALL[(i % 3) as usize],
                base + Duration::days(i % 31) + Duration::seconds(i * 37 % 86_400),
            )
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [1_000, 10_000, 100_000].iter() {
        let table = create_table(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| black_box(Aggregator::aggregate(table)));
        });
    }

    group.finish();
}

fn bench_pair_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_counts");

    for size in [1_000, 10_000, 100_000].iter() {
        let table = create_table(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| black_box(Aggregator::pair_counts(table)));
        });
    }

    group.finish();
}

fn bench_top_users(c: &mut Criterion) {
    let table = create_table(100_000);
    c.bench_function("top_users_100000", |b| {
        b.iter(|| black_box(Aggregator::top_users(&table, TOP_N_USERS)));
    });
}

criterion_group!(benches, bench_aggregate, bench_pair_counts, bench_top_users);
criterion_main!(benches);
