//! # Codec Benchmarks
//!
//! Performance benchmarks for encoding and decoding store files.
//!
//! Run with: `cargo bench -p textdb-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use textdb_core::{Entries, Separator, Table, decode, encode};

/// Create a mapping with N short entries.
fn create_entries(size: usize) -> Entries {
    (0..size)
        .map(|i| (format!("player_{i:06}"), format!("score={}", i * 7)))
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let sep = Separator::default();

    for size in [100, 1000, 10000].iter() {
        let entries = create_entries(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| black_box(encode(entries, &sep)));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let sep = Separator::default();

    for size in [100, 1000, 10000].iter() {
        let text = encode(&create_entries(*size), &sep);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| black_box(decode(text, &sep).expect("decode")));
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [100, 1000, 10000].iter() {
        let disk = create_entries(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &disk, |b, disk| {
            b.iter(|| {
                let table = Table::new(Separator::default());
                for i in 0..100 {
                    let _ = table.set(format!("player_{i:06}"), "updated");
                }
                black_box(table.merge(disk.clone()))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_merge);
criterion_main!(benches);
