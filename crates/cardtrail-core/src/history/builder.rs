//! Building the next history entry from the live card set.
//!
//! An entry is FULL when there is no previous state, when the caller forces
//! it, when it is named, or when the trailing run of deltas has reached the
//! checkpoint interval. Otherwise it is a DELTA carrying only the cards that
//! differ from (or are absent in) the previous resolved state, plus the ids
//! that disappeared.

use std::collections::BTreeSet;

use crate::config::HistoryConfig;
use crate::model::{CardId, CardSnapshot, CardState, HistorySnapshot, SnapshotId};

use super::promote::{self, PromotionInput};
use super::resolve::tree_order;

/// Caller options for one snapshot request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub name: Option<String>,
    pub force_full: bool,
    /// Record an entry even when nothing changed.
    pub allow_empty: bool,
    /// Card holding notes about this point in history.
    pub note: Option<CardId>,
}

impl SnapshotRequest {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn full() -> Self {
        Self {
            force_full: true,
            ..Self::default()
        }
    }

    /// True when the request carries a non-blank name.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

/// Cards that changed or appeared, and ids that vanished, going `previous` → `current`.
///
/// Both outputs are in id order.
#[must_use]
pub fn compute_delta(
    previous: &CardState,
    current: &CardState,
) -> (Vec<CardSnapshot>, BTreeSet<CardId>) {
    let changed = current
        .iter()
        .filter(|(id, snap)| previous.get(*id) != Some(*snap))
        .map(|(_, snap)| snap.clone())
        .collect();
    let deleted = previous
        .keys()
        .filter(|id| !current.contains_key(*id))
        .cloned()
        .collect();
    (changed, deleted)
}

/// Fold one entry onto a working state in place.
///
/// Deltas remove their deleted ids and upsert their cards; a full entry
/// replaces the state wholesale.
pub fn apply_entry(state: &mut CardState, entry: &HistorySnapshot) {
    if entry.is_full() {
        state.clear();
    } else {
        for id in &entry.deleted {
            state.remove(id);
        }
    }
    for snap in &entry.cards {
        state.insert(snap.id.clone(), snap.clone());
    }
}

/// Number of consecutive delta entries at the end of `entries`.
#[must_use]
pub fn trailing_delta_run(entries: &[HistorySnapshot]) -> usize {
    entries.iter().rev().take_while(|e| e.is_delta).count()
}

/// Stamp and identity for an entry about to be built.
#[derive(Debug, Clone)]
pub struct EntryStamp {
    pub id: SnapshotId,
    pub timestamp_us: i64,
}

/// Build the next entry, or `None` when the request is a no-op.
///
/// `previous` is the resolved state at the last entry of `entries`
/// (`None` only when `entries` is empty).
#[must_use]
pub fn build_entry(
    entries: &[HistorySnapshot],
    previous: Option<&CardState>,
    current: &CardState,
    request: &SnapshotRequest,
    stamp: EntryStamp,
    config: &HistoryConfig,
) -> Option<HistorySnapshot> {
    let (changed, deleted) = match previous {
        Some(prev) => compute_delta(prev, current),
        None => (current.values().cloned().collect(), BTreeSet::new()),
    };

    let named = request.is_named();
    let checkpoint_due = trailing_delta_run(entries) >= config.checkpoint_interval;
    let forced = previous.is_none() || request.force_full || named;

    if !forced && changed.is_empty() && deleted.is_empty() && !request.allow_empty {
        return None;
    }

    let full = forced || checkpoint_due;
    let promotion = promote::evaluate(
        &PromotionInput {
            name: request.name.as_deref(),
            timestamp_us: stamp.timestamp_us,
            previous,
            current,
            changed: &changed,
            deleted: &deleted,
            previous_timestamp_us: entries.last().map(|e| e.timestamp_us),
        },
        &config.promotion,
    );

    let (cards, deleted) = if full {
        (tree_order(current), BTreeSet::new())
    } else {
        (changed, deleted)
    };

    Some(HistorySnapshot {
        id: stamp.id,
        timestamp_us: stamp.timestamp_us,
        name: request.name.clone().filter(|_| named),
        is_delta: !full,
        cards,
        deleted,
        promoted: promotion.is_some(),
        promotion,
        note: request.note.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, PromotionReason, state_of};

    fn stamp(ts: i64) -> EntryStamp {
        EntryStamp {
            id: SnapshotId::new(format!("hs-{ts}")),
            timestamp_us: ts,
        }
    }

    #[test]
    fn first_entry_is_full_and_initial() {
        let cur = state_of(&[Card::new("a", "A")]);
        let entry = build_entry(
            &[],
            None,
            &cur,
            &SnapshotRequest::default(),
            stamp(1),
            &HistoryConfig::default(),
        )
        .expect("first entry");
        assert!(entry.is_full());
        assert_eq!(entry.promotion, Some(PromotionReason::Initial));
        assert_eq!(entry.cards.len(), 1);
    }

    #[test]
    fn unchanged_state_is_a_noop_unless_empty_allowed() {
        let cur = state_of(&[Card::new("a", "A")]);
        let cfg = HistoryConfig::default();
        let first = build_entry(&[], None, &cur, &SnapshotRequest::default(), stamp(1), &cfg)
            .expect("first entry");
        let entries = vec![first];

        let none = build_entry(
            &entries,
            Some(&cur),
            &cur,
            &SnapshotRequest::default(),
            stamp(2),
            &cfg,
        );
        assert!(none.is_none());

        let empty = build_entry(
            &entries,
            Some(&cur),
            &cur,
            &SnapshotRequest {
                allow_empty: true,
                ..SnapshotRequest::default()
            },
            stamp(2),
            &cfg,
        )
        .expect("empty checkpoint");
        assert!(empty.is_empty_delta());
        assert!(!empty.promoted);
    }

    #[test]
    fn delta_carries_only_changes() {
        let prev = state_of(&[Card::new("a", "A"), Card::new("b", "B"), Card::new("c", "C")]);
        let cur = state_of(&[Card::new("a", "A"), Card::new("b", "B2"), Card::new("d", "D")]);
        let (changed, deleted) = compute_delta(&prev, &cur);
        let ids: Vec<&str> = changed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
        assert_eq!(deleted.into_iter().collect::<Vec<_>>(), vec![CardId::new("c")]);
    }

    #[test]
    fn apply_entry_reproduces_target() {
        let prev = state_of(&[Card::new("a", "A"), Card::new("c", "C")]);
        let cur = state_of(&[Card::new("a", "A!"), Card::new("d", "D")]);
        let (cards, deleted) = compute_delta(&prev, &cur);
        let delta = HistorySnapshot {
            id: SnapshotId::new("hs-d"),
            timestamp_us: 2,
            name: None,
            is_delta: true,
            cards,
            deleted,
            promoted: false,
            promotion: None,
            note: None,
        };
        let mut state = prev;
        apply_entry(&mut state, &delta);
        assert_eq!(state, cur);
    }

    #[test]
    fn named_request_is_full_and_keeps_name_and_note() {
        let cur = state_of(&[Card::new("a", "A")]);
        let cfg = HistoryConfig::default();
        let first = build_entry(&[], None, &cur, &SnapshotRequest::default(), stamp(1), &cfg)
            .expect("first entry");
        let request = SnapshotRequest {
            note: Some(CardId::new("note-1")),
            ..SnapshotRequest::named("Draft 1")
        };
        let named = build_entry(&[first], Some(&cur), &cur, &request, stamp(2), &cfg)
            .expect("named entry");
        assert!(named.is_full());
        assert_eq!(named.name.as_deref(), Some("Draft 1"));
        assert_eq!(named.promotion, Some(PromotionReason::Named));
        assert_eq!(named.note, Some(CardId::new("note-1")));
    }

    #[test]
    fn checkpoint_interval_forces_full() {
        let cfg = HistoryConfig {
            checkpoint_interval: 2,
            ..HistoryConfig::default()
        };
        let mut entries = Vec::new();
        let mut previous: Option<CardState> = None;
        for i in 0..5_i64 {
            let cur = state_of(&[Card::new("a", "x".repeat(usize::try_from(i).unwrap_or(0) + 1))]);
            let entry = build_entry(
                &entries,
                previous.as_ref(),
                &cur,
                &SnapshotRequest::default(),
                stamp(i + 1),
                &cfg,
            )
            .expect("entry");
            entries.push(entry);
            previous = Some(cur);
        }
        let shape: Vec<bool> = entries.iter().map(|e| e.is_delta).collect();
        assert_eq!(shape, vec![false, true, true, false, true]);
    }
}
