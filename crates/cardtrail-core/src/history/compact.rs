//! Age-tiered retention and re-encoding of the history sequence.
//!
//! Over time the history grows. Compaction thins out unpromoted entries,
//! keeping one entry per time bucket, then rebuilds the surviving subset so
//! every retained point still resolves to exactly the state it had before.
//!
//! # Selection
//!
//! Every unpromoted entry is assigned a tier by age:
//!
//! | age | tier | bucket width (default) |
//! |---|---|---|
//! | ≤ 1 hour | `recent-hour` | 60 s |
//! | ≤ 1 day | `recent-day` | 10 min |
//! | ≤ 7 days | `recent-week` | 1 hour |
//! | ≤ 30 days | `recent-month` | 1 day |
//! | older | `archive` | 7 days |
//!
//! Within each `(tier, bucket)` only the latest entry survives. The first
//! entry, the last entry and every promoted entry are always retained.
//! Buckets are aligned to the epoch (`timestamp / width`) so they do not
//! shift as time passes.
//!
//! # Rebuild
//!
//! Retained entries keep their id, timestamp, name, promotion and note, but
//! their encoding is re-derived against the rebuilt sequence:
//!
//! - FULL: first and last retained, promoted, originally full, or when the
//!   rebuilt delta run has reached the checkpoint interval.
//! - DELTA: everything else, against the previous rebuilt state. A delta
//!   that would be empty is dropped (its state equals its predecessor's).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::clock::{MICROS_PER_DAY, MICROS_PER_HOUR, MICROS_PER_SEC};
use crate::config::{CompactionConfig, HistoryConfig, RetentionConfig};
use crate::model::{CardState, HistorySnapshot, SnapshotId};

use super::builder::{apply_entry, compute_delta};
use super::resolve::{resolve, tree_order};

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Age band used to pick a bucket width during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionTier {
    RecentHour,
    RecentDay,
    RecentWeek,
    RecentMonth,
    Archive,
}

impl RetentionTier {
    /// Tier for an entry `age_us` old. Negative ages (future stamps) count as zero.
    #[must_use]
    pub const fn for_age(age_us: i64) -> Self {
        let age = if age_us < 0 { 0 } else { age_us };
        if age <= MICROS_PER_HOUR {
            Self::RecentHour
        } else if age <= MICROS_PER_DAY {
            Self::RecentDay
        } else if age <= 7 * MICROS_PER_DAY {
            Self::RecentWeek
        } else if age <= 30 * MICROS_PER_DAY {
            Self::RecentMonth
        } else {
            Self::Archive
        }
    }

    #[must_use]
    pub const fn bucket_width_us(self, retention: &RetentionConfig) -> i64 {
        let secs = match self {
            Self::RecentHour => retention.hour_bucket_secs,
            Self::RecentDay => retention.day_bucket_secs,
            Self::RecentWeek => retention.week_bucket_secs,
            Self::RecentMonth => retention.month_bucket_secs,
            Self::Archive => retention.archive_bucket_secs,
        };
        let width = secs.saturating_mul(MICROS_PER_SEC);
        if width < 1 { 1 } else { width }
    }
}

// ---------------------------------------------------------------------------
// CompactionReport
// ---------------------------------------------------------------------------

/// Summary of one compaction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    /// Entries in the sequence before compaction.
    pub entries_before: usize,
    /// Entries in the sequence after compaction.
    pub entries_after: usize,
    /// Entries discarded by bucket selection.
    pub dropped_by_selection: usize,
    /// Retained entries dropped because their rebuilt delta was empty.
    pub dropped_empty: usize,
    /// Rebuilt entries encoded as full.
    pub full_entries: usize,
    /// Promoted entries carried through.
    pub promoted_kept: usize,
    /// True when the synthetic final-state entry had to be emitted.
    pub fallback_used: bool,
}

impl CompactionReport {
    /// Entries removed in total.
    #[must_use]
    pub const fn removed(&self) -> usize {
        self.entries_before.saturating_sub(self.entries_after)
    }
}

// ---------------------------------------------------------------------------
// Core compaction functions
// ---------------------------------------------------------------------------

/// Whether automatic compaction should run for a sequence of `len` entries.
///
/// `last_compacted_len` is the length right after the previous run (0 if never).
#[must_use]
pub const fn should_compact(len: usize, last_compacted_len: usize, config: &CompactionConfig) -> bool {
    len > config.min_entries && len.saturating_sub(last_compacted_len) >= config.stride
}

/// Indices to retain, ascending.
#[must_use]
pub fn select_retained(
    entries: &[HistorySnapshot],
    now_us: i64,
    retention: &RetentionConfig,
) -> Vec<usize> {
    if entries.is_empty() {
        return Vec::new();
    }

    let mut latest_in_bucket: BTreeMap<(RetentionTier, i64), usize> = BTreeMap::new();
    let mut keep: BTreeSet<usize> = BTreeSet::new();
    keep.insert(0);
    keep.insert(entries.len() - 1);

    for (index, entry) in entries.iter().enumerate() {
        if entry.promoted {
            keep.insert(index);
            continue;
        }
        let tier = RetentionTier::for_age(now_us.saturating_sub(entry.timestamp_us));
        let bucket = entry.timestamp_us.div_euclid(tier.bucket_width_us(retention));
        // Later indices overwrite earlier ones: timestamps increase along the sequence.
        latest_in_bucket.insert((tier, bucket), index);
    }

    keep.extend(latest_in_bucket.into_values());
    keep.into_iter().collect()
}

/// Re-encode the retained subset of `entries` as a fresh full/delta sequence.
///
/// `retained` must be ascending and in range.
#[must_use]
pub fn rebuild(
    entries: &[HistorySnapshot],
    retained: &[usize],
    config: &HistoryConfig,
) -> (Vec<HistorySnapshot>, CompactionReport) {
    let mut report = CompactionReport {
        entries_before: entries.len(),
        dropped_by_selection: entries.len().saturating_sub(retained.len()),
        ..CompactionReport::default()
    };

    let mut out: Vec<HistorySnapshot> = Vec::with_capacity(retained.len());
    let mut working = CardState::new();
    let mut previous: Option<CardState> = None;
    let mut folded = 0;
    let mut run = 0;

    for (pos, &index) in retained.iter().enumerate() {
        while folded <= index {
            apply_entry(&mut working, &entries[folded]);
            folded += 1;
        }

        let original = &entries[index];
        let is_last = pos + 1 == retained.len();
        let full = out.is_empty()
            || is_last
            || original.promoted
            || original.is_full()
            || run >= config.checkpoint_interval;

        let (cards, deleted) = match (&previous, full) {
            (Some(prev), false) => {
                let (changed, deleted) = compute_delta(prev, &working);
                if changed.is_empty() && deleted.is_empty() {
                    report.dropped_empty += 1;
                    continue;
                }
                (changed, deleted)
            }
            _ => (tree_order(&working), BTreeSet::new()),
        };
        let is_delta = !full && previous.is_some();

        if is_delta {
            run += 1;
        } else {
            run = 0;
            report.full_entries += 1;
        }
        if original.promoted {
            report.promoted_kept += 1;
        }

        out.push(HistorySnapshot {
            id: original.id.clone(),
            timestamp_us: original.timestamp_us,
            name: original.name.clone(),
            is_delta,
            cards,
            deleted,
            promoted: original.promoted,
            promotion: original.promotion,
            note: original.note.clone(),
        });
        previous = Some(working.clone());
    }

    if out.is_empty()
        && let Some(last) = entries.last()
    {
        let state = resolve(entries, entries.len() - 1).unwrap_or_default();
        out.push(HistorySnapshot {
            id: SnapshotId::derive(last.timestamp_us, u64::MAX, Some("compaction-fallback"), state.len()),
            timestamp_us: last.timestamp_us,
            name: None,
            is_delta: false,
            cards: tree_order(&state),
            deleted: BTreeSet::new(),
            promoted: last.promoted,
            promotion: last.promotion,
            note: last.note.clone(),
        });
        report.fallback_used = true;
        report.full_entries += 1;
    }

    report.entries_after = out.len();
    (out, report)
}

/// Select and rebuild in one step.
#[must_use]
pub fn compact_entries(
    entries: &[HistorySnapshot],
    now_us: i64,
    config: &HistoryConfig,
) -> (Vec<HistorySnapshot>, CompactionReport) {
    let retained = select_retained(entries, now_us, &config.retention);
    rebuild(entries, &retained, config)
}

/// Verify that every retained point resolves identically after compaction.
///
/// For each retained original index, the matching rebuilt point is the
/// latest rebuilt entry stamped at or before the original entry (entries
/// dropped as empty resolve to their predecessor's state).
#[must_use]
pub fn verify_compaction(
    original: &[HistorySnapshot],
    retained: &[usize],
    rebuilt: &[HistorySnapshot],
) -> bool {
    for &index in retained {
        let Some(entry) = original.get(index) else {
            return false;
        };
        let Some(pos) = rebuilt
            .iter()
            .rposition(|e| e.timestamp_us <= entry.timestamp_us)
        else {
            return false;
        };
        if rebuilt[pos].timestamp_us == entry.timestamp_us && rebuilt[pos].id != entry.id {
            return false;
        }
        if resolve(original, index) != resolve(rebuilt, pos) {
            tracing::warn!(index, rebuilt_index = pos, "compaction changed a retained state");
            return false;
        }
    }
    true
}
