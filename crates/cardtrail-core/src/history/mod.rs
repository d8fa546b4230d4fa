//! The versioned history of one document.
//!
//! [`History`] owns the ordered sequence of [`HistorySnapshot`] entries and
//! is the only thing that mutates it, through three operations: recording a
//! snapshot, compacting, and (via the document) restoring. Resolution is a
//! pure read over the sequence.
//!
//! ## Submodules
//!
//! - [`builder`] - full/delta encoding of the next entry.
//! - [`promote`] - permanent-retention rules.
//! - [`resolve`] - state reconstruction and stable tree order.
//! - [`compact`] - age-tiered selection and rebuild.
//! - [`verify`] - sequence invariant checks.
//! - [`diff`] - field-level comparison of two states.

pub mod builder;
pub mod compact;
pub mod diff;
pub mod promote;
pub mod resolve;
pub mod verify;

use serde::{Deserialize, Serialize};

use crate::clock::next_timestamp;
use crate::config::HistoryConfig;
use crate::model::{CardSnapshot, CardState, HistorySnapshot, SnapshotId};

pub use builder::SnapshotRequest;
pub use compact::CompactionReport;

/// Ordered, strictly time-increasing sequence of history entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistorySnapshot>,
    /// Sequence length right after the last compaction run.
    #[serde(default)]
    last_compacted_len: usize,
    /// Monotonic counter mixed into derived snapshot ids.
    #[serde(default)]
    next_seq: u64,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[HistorySnapshot] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&HistorySnapshot> {
        self.entries.get(index)
    }

    #[must_use]
    pub const fn last_compacted_len(&self) -> usize {
        self.last_compacted_len
    }

    /// Index of the entry with `id`, if it is still retained.
    #[must_use]
    pub fn position(&self, id: &SnapshotId) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == id)
    }

    /// Resolved id → snapshot map at `index`.
    #[must_use]
    pub fn resolve(&self, index: usize) -> Option<CardState> {
        resolve::resolve(&self.entries, index)
    }

    /// Resolved cards at `index` in stable tree order.
    #[must_use]
    pub fn resolve_ordered(&self, index: usize) -> Option<Vec<CardSnapshot>> {
        resolve::resolve_ordered(&self.entries, index)
    }

    /// State at the newest entry, `None` for an empty history.
    #[must_use]
    pub fn latest_state(&self) -> Option<CardState> {
        self.entries
            .len()
            .checked_sub(1)
            .and_then(|last| self.resolve(last))
    }

    /// Record `current` as the next point in history.
    ///
    /// Returns the indices of the appended entries: none for a no-op, two
    /// for a named request (the named full entry plus an unnamed companion
    /// marking the post-naming current state).
    pub fn record(
        &mut self,
        current: &CardState,
        request: &SnapshotRequest,
        now_us: i64,
        config: &HistoryConfig,
    ) -> Vec<usize> {
        let mut appended = Vec::new();
        if let Some(index) = self.append(current, request, now_us, config) {
            appended.push(index);
        }

        if request.is_named() && !appended.is_empty() {
            let companion = SnapshotRequest {
                allow_empty: true,
                ..SnapshotRequest::default()
            };
            if let Some(index) = self.append(current, &companion, now_us, config) {
                appended.push(index);
            }
        }
        appended
    }

    fn append(
        &mut self,
        current: &CardState,
        request: &SnapshotRequest,
        now_us: i64,
        config: &HistoryConfig,
    ) -> Option<usize> {
        let previous = self.latest_state();
        let timestamp_us = next_timestamp(now_us, self.entries.last().map(|e| e.timestamp_us));
        let stamp = builder::EntryStamp {
            id: SnapshotId::derive(
                timestamp_us,
                self.next_seq,
                request.name.as_deref(),
                current.len(),
            ),
            timestamp_us,
        };

        let Some(entry) = builder::build_entry(
            &self.entries,
            previous.as_ref(),
            current,
            request,
            stamp,
            config,
        ) else {
            tracing::debug!(entries = self.entries.len(), "no changes; snapshot skipped");
            return None;
        };

        self.next_seq += 1;
        let index = self.entries.len();
        tracing::debug!(
            index,
            id = %entry.id,
            is_delta = entry.is_delta,
            cards = entry.cards.len(),
            deleted = entry.deleted.len(),
            promotion = entry.promotion.map(|r| r.as_str()),
            "history entry appended"
        );
        self.entries.push(entry);
        Some(index)
    }

    /// Whether the growth thresholds call for an automatic compaction.
    #[must_use]
    pub fn should_compact(&self, config: &HistoryConfig) -> bool {
        compact::should_compact(self.entries.len(), self.last_compacted_len, &config.compaction)
    }

    /// Compact when forced or when the growth thresholds are met.
    ///
    /// Indices held by callers may be stale afterward and must be re-clamped.
    pub fn compact(
        &mut self,
        now_us: i64,
        config: &HistoryConfig,
        force: bool,
    ) -> Option<CompactionReport> {
        if !force && !self.should_compact(config) {
            return None;
        }
        if self.entries.is_empty() {
            return Some(CompactionReport::default());
        }

        let retained = compact::select_retained(&self.entries, now_us, &config.retention);
        let (rebuilt, report) = compact::rebuild(&self.entries, &retained, config);

        let violations = verify::validate(&rebuilt, config.checkpoint_interval);
        if !violations.is_empty() {
            tracing::warn!(count = violations.len(), "rebuilt history violates invariants");
        }

        tracing::info!(
            before = report.entries_before,
            after = report.entries_after,
            dropped_by_selection = report.dropped_by_selection,
            dropped_empty = report.dropped_empty,
            forced = force,
            "history compacted"
        );
        self.entries = rebuilt;
        self.last_compacted_len = self.entries.len();
        Some(report)
    }

    /// Check this history against the sequence invariants.
    #[must_use]
    pub fn validate(&self, config: &HistoryConfig) -> Vec<verify::Violation> {
        verify::validate(&self.entries, config.checkpoint_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, PromotionReason, state_of};

    #[test]
    fn named_record_appends_full_named_then_companion() {
        let cfg = HistoryConfig::default();
        let mut history = History::new();
        let state = state_of(&[Card::new("a", "A")]);
        assert_eq!(history.record(&state, &SnapshotRequest::default(), 10, &cfg), vec![0]);

        let appended = history.record(&state, &SnapshotRequest::named("Draft 1"), 10, &cfg);
        assert_eq!(appended, vec![1, 2]);

        let named = &history.entries()[1];
        assert!(named.is_full());
        assert_eq!(named.promotion, Some(PromotionReason::Named));
        let companion = &history.entries()[2];
        assert!(companion.is_empty_delta());
        assert!(companion.name.is_none());
        assert!(!companion.promoted);

        let stamps: Vec<i64> = history.entries().iter().map(|e| e.timestamp_us).collect();
        assert_eq!(stamps, vec![10, 11, 12]);
    }

    #[test]
    fn noop_record_appends_nothing() {
        let cfg = HistoryConfig::default();
        let mut history = History::new();
        let state = state_of(&[Card::new("a", "A")]);
        history.record(&state, &SnapshotRequest::default(), 1, &cfg);
        assert!(history.record(&state, &SnapshotRequest::default(), 2, &cfg).is_empty());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn compaction_waits_for_thresholds_unless_forced() {
        let cfg = HistoryConfig::default();
        let mut history = History::new();
        for i in 0..20_i64 {
            let state = state_of(&[Card::new("a", format!("v{i}"))]);
            history.record(&state, &SnapshotRequest::default(), i, &cfg);
        }
        assert!(history.compact(100, &cfg, false).is_none());

        let report = history.compact(100, &cfg, true).expect("forced run");
        assert_eq!(report.entries_before, 20);
        assert_eq!(history.last_compacted_len(), history.len());
        assert!(history.validate(&cfg).is_empty());
    }

    #[test]
    fn ids_are_unique_across_records() {
        let cfg = HistoryConfig::default();
        let mut history = History::new();
        for i in 0..5_i64 {
            let state = state_of(&[Card::new("a", format!("v{i}"))]);
            history.record(&state, &SnapshotRequest::default(), 1, &cfg);
        }
        let mut ids: Vec<&str> = history.entries().iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }
}
