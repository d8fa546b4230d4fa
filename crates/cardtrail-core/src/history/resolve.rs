//! Reconstructing card state at a history index, and stable tree ordering.
//!
//! # Algorithm
//!
//! 1. Scan backward from the target to the nearest full entry (inclusive).
//! 2. Seed the working state from that entry's cards.
//! 3. Fold every following entry through the target: deltas drop their
//!    deleted ids and upsert their cards, a full entry replaces the state.
//!
//! # Ordering
//!
//! Output order is a depth-first walk from the roots (cards without a
//! parent), siblings sorted by `(order, id)`. Cards that no root reaches
//! (dangling parent, parent cycle) are flushed afterward, each followed by
//! its own reachable descendants. Every card is emitted exactly once.

use std::collections::{BTreeMap, HashSet};

use crate::model::{CardId, CardSnapshot, CardState, HistorySnapshot};

use super::builder::apply_entry;

/// Resolve the id → snapshot map at `index`, or `None` when out of range.
#[must_use]
pub fn resolve(entries: &[HistorySnapshot], index: usize) -> Option<CardState> {
    if index >= entries.len() {
        tracing::debug!(index, entries = entries.len(), "resolve index out of range");
        return None;
    }

    let seed = entries[..=index].iter().rposition(HistorySnapshot::is_full);
    let start = seed.unwrap_or_else(|| {
        tracing::warn!(index, "no full entry at or before index; folding from an empty state");
        0
    });

    let mut state = CardState::new();
    for entry in &entries[start..=index] {
        apply_entry(&mut state, entry);
    }
    Some(state)
}

/// Resolve `index` and emit its cards in stable tree order.
#[must_use]
pub fn resolve_ordered(entries: &[HistorySnapshot], index: usize) -> Option<Vec<CardSnapshot>> {
    resolve(entries, index).map(|state| tree_order(&state))
}

/// Depth-first, parent-before-child ordering of a resolved state.
#[must_use]
pub fn tree_order(state: &CardState) -> Vec<CardSnapshot> {
    let mut children: BTreeMap<Option<&CardId>, Vec<&CardSnapshot>> = BTreeMap::new();
    for snap in state.values() {
        children.entry(snap.parent.as_ref()).or_default().push(snap);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    }

    let mut out = Vec::with_capacity(state.len());
    let mut visited: HashSet<&CardId> = HashSet::with_capacity(state.len());

    for root in children.get(&None).into_iter().flatten().copied() {
        emit_subtree(root, &children, &mut visited, &mut out);
    }

    if out.len() < state.len() {
        let mut orphans: Vec<&CardSnapshot> = state
            .values()
            .filter(|snap| !visited.contains(&snap.id))
            .collect();
        orphans.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        tracing::debug!(count = orphans.len(), "flushing cards unreachable from a root");
        for orphan in orphans {
            if visited.contains(&orphan.id) {
                continue;
            }
            let head = orphan_head(orphan, state, &visited);
            emit_subtree(head, &children, &mut visited, &mut out);
        }
    }

    out
}

/// Climb the parent chain from `start` while parents exist and no card repeats.
fn orphan_head<'a>(
    start: &'a CardSnapshot,
    state: &'a CardState,
    visited: &HashSet<&'a CardId>,
) -> &'a CardSnapshot {
    let mut climbed: HashSet<&CardId> = HashSet::new();
    climbed.insert(&start.id);
    let mut node = start;
    while let Some(parent) = node.parent.as_ref().and_then(|id| state.get(id)) {
        if visited.contains(&parent.id) || !climbed.insert(&parent.id) {
            break;
        }
        node = parent;
    }
    node
}

fn emit_subtree<'a>(
    root: &'a CardSnapshot,
    children: &BTreeMap<Option<&'a CardId>, Vec<&'a CardSnapshot>>,
    visited: &mut HashSet<&'a CardId>,
    out: &mut Vec<CardSnapshot>,
) {
    // Explicit stack: deep outlines must not overflow the call stack.
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !visited.insert(&node.id) {
            continue;
        }
        out.push(node.clone());
        if let Some(kids) = children.get(&Some(&node.id)) {
            stack.extend(kids.iter().rev().copied().filter(|kid| !visited.contains(&kid.id)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, SnapshotId, state_of};
    use std::collections::BTreeSet;

    fn ids(snaps: &[CardSnapshot]) -> Vec<&str> {
        snaps.iter().map(|s| s.id.as_str()).collect()
    }

    fn full(ts: i64, cards: &[Card]) -> HistorySnapshot {
        HistorySnapshot {
            id: SnapshotId::new(format!("hs-{ts}")),
            timestamp_us: ts,
            name: None,
            is_delta: false,
            cards: cards.iter().map(Card::snapshot).collect(),
            deleted: BTreeSet::new(),
            promoted: false,
            promotion: None,
            note: None,
        }
    }

    fn delta(ts: i64, cards: &[Card], deleted: &[&str]) -> HistorySnapshot {
        HistorySnapshot {
            is_delta: true,
            deleted: deleted.iter().map(|id| CardId::new(*id)).collect(),
            ..full(ts, cards)
        }
    }

    #[test]
    fn tree_order_is_depth_first_by_order_then_id() {
        let state = state_of(&[
            Card::new("root2", "r2"),
            Card::new("root1", "r1"),
            Card::new("b", "b").with_parent("root1", 1),
            Card::new("a", "a").with_parent("root1", 1),
            Card::new("first", "f").with_parent("root1", 0),
            Card::new("a1", "a1").with_parent("a", 0),
        ]);
        let ordered = tree_order(&state);
        assert_eq!(ids(&ordered), vec!["root1", "first", "a", "a1", "b", "root2"]);
    }

    #[test]
    fn cycles_and_dangling_parents_are_flushed_once() {
        let state = state_of(&[
            Card::new("root", "r"),
            Card::new("x", "x").with_parent("y", 0),
            Card::new("y", "y").with_parent("x", 0),
            Card::new("lost", "l").with_parent("missing", 5),
            Card::new("lost-child", "lc").with_parent("lost", 0),
        ]);
        let ordered = tree_order(&state);
        assert_eq!(ordered.len(), 5);
        assert_eq!(ordered[0].id.as_str(), "root");
        let unique: HashSet<&str> = ids(&ordered).into_iter().collect();
        assert_eq!(unique.len(), 5);

        let lost = ordered.iter().position(|s| s.id.as_str() == "lost");
        let child = ordered.iter().position(|s| s.id.as_str() == "lost-child");
        assert!(lost < child);
    }

    #[test]
    fn resolve_folds_deltas_from_last_full() {
        let entries = vec![
            full(1, &[Card::new("a", "A")]),
            delta(2, &[Card::new("a", "AB")], &[]),
            delta(3, &[Card::new("b", "B").with_parent("a", 0)], &[]),
            full(4, &[Card::new("z", "Z")]),
            delta(5, &[Card::new("y", "Y")], &["z"]),
        ];

        let at1 = resolve_ordered(&entries, 1).expect("in range");
        assert_eq!(ids(&at1), vec!["a"]);
        assert_eq!(at1[0].content, "AB");

        let at2 = resolve_ordered(&entries, 2).expect("in range");
        assert_eq!(ids(&at2), vec!["a", "b"]);

        let at4 = resolve(&entries, 4).expect("in range");
        assert_eq!(at4.keys().map(CardId::as_str).collect::<Vec<_>>(), vec!["y"]);
    }

    #[test]
    fn out_of_range_is_none() {
        let entries = vec![full(1, &[Card::new("a", "A")])];
        assert!(resolve(&entries, 1).is_none());
        assert!(resolve(&[], 0).is_none());
    }
}
