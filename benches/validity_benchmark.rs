//! Benchmark for the validity tracker under edit load.
//!
//! Builds a fragmented partition (alternating valid/invalid runs) and
//! measures edits, invalid-range queries, and revalidation against it.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use irodori::text::Edit;
use irodori::{RangeTarget, Span, ValidityTracker};
use std::hint::black_box;

/// A tracker of `runs` alternating runs, each 16 units long.
fn fragmented_tracker(runs: usize) -> ValidityTracker {
    let mut tracker = ValidityTracker::new(runs * 16);
    for i in (0..runs).step_by(2) {
        tracker.mark_valid(Span::new(i * 16, 16));
    }
    tracker
}

fn benchmark_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_changed");
    for runs in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("typing_mid_document", runs), &runs, |b, &runs| {
            b.iter_batched(
                || fragmented_tracker(runs),
                |mut tracker| {
                    let mid = tracker.length() / 2;
                    for i in 0..32 {
                        tracker.content_changed(black_box(&Edit::insertion(mid + i, 1)));
                    }
                    tracker
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("invalid_ranges");
    for runs in [100, 1_000, 10_000] {
        let tracker = fragmented_tracker(runs);
        let viewport = RangeTarget::Span(Span::new(tracker.length() / 2, 2_000));
        group.bench_with_input(BenchmarkId::new("viewport", runs), &runs, |b, _| {
            b.iter(|| black_box(tracker.invalid_ranges(black_box(&viewport))));
        });
    }
    group.finish();
}

fn benchmark_revalidation(c: &mut Criterion) {
    c.bench_function("mark_valid_all_fragments", |b| {
        b.iter_batched(
            || fragmented_tracker(1_000),
            |mut tracker| {
                for span in tracker.invalid_ranges(&RangeTarget::All) {
                    tracker.mark_valid(span);
                }
                tracker
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, benchmark_edits, benchmark_queries, benchmark_revalidation);
criterion_main!(benches);
