//! History benchmarks: recording, resolving and compacting.
//!
//! Run with:
//! ```sh
//! cargo bench --bench history
//! ```

use cardtrail_core::Document;
use cardtrail_core::clock::{Clock, MICROS_PER_HOUR, ManualClock};
use cardtrail_core::config::HistoryConfig;
use cardtrail_core::history::compact::compact_entries;
use cardtrail_core::model::CardId;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const SIZES: [usize; 3] = [100, 1_000, 5_000];

/// A document with `cards` cards and `entries` recorded edits, one per
/// simulated hour. Automatic compaction is disabled so the full sequence is
/// available to measure.
fn seeded(cards: usize, entries: usize) -> (Document, ManualClock) {
    let mut config = HistoryConfig::default();
    config.compaction.min_entries = usize::MAX;
    let clock = ManualClock::new(1_700_000_000_000_000);
    let mut doc = Document::new(config, clock.clone());

    let mut ids: Vec<CardId> = Vec::with_capacity(cards);
    for i in 0..cards {
        let parent = (i > 0).then(|| ids[(i - 1) / 4].clone());
        let id = doc
            .add_card(format!("card {i}"), parent, "scene", None)
            .unwrap_or_else(|e| panic!("seed card {i}: {e}"));
        ids.push(id);
    }
    doc.take_snapshot(false, None, None);

    for step in 0..entries {
        clock.advance(MICROS_PER_HOUR);
        let id = &ids[step % ids.len()];
        doc.edit_content(id, format!("card edit {step}"))
            .unwrap_or_else(|e| panic!("edit {step}: {e}"));
        doc.take_snapshot(false, None, None);
    }
    (doc, clock)
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("history.resolve");
    for size in SIZES {
        let (doc, _) = seeded(200, size);
        let last = doc.history().len() - 1;
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| black_box(doc.resolve_state(black_box(last))));
        });
    }
    group.finish();
}

fn bench_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("history.compact");
    for size in SIZES {
        let (doc, clock) = seeded(200, size);
        let now = clock.now_us();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| black_box(compact_entries(doc.history().entries(), now, doc.config())));
        });
    }
    group.finish();
}

fn bench_record(c: &mut Criterion) {
    c.bench_function("history.record.single_edit", |b| {
        let (mut doc, clock) = seeded(200, 25);
        let id = doc.cards().next().map(|c| c.id.clone());
        let mut step = 0_u64;
        b.iter(|| {
            step += 1;
            clock.advance(1_000_000);
            if let Some(id) = &id {
                let _ = doc.edit_content(id, format!("bench {step}"));
            }
            black_box(doc.take_snapshot(false, None, None))
        });
    });
}

criterion_group!(benches, bench_resolve, bench_compact, bench_record);
criterion_main!(benches);
