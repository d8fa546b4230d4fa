//! Promotion: deciding which history entries are never compacted away.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! | # | Condition | Reason |
//! |---|---|---|
//! | 1 | entry has a non-empty name | `named` |
//! | 2 | no previous state (first entry) | `initial` |
//! | 3 | any card added or deleted | `structure-add-delete` |
//! | 4 | any changed card moved, re-categorized, floated, archived or re-cloned | `structure-move` |
//! | 5 | edit score ≥ threshold, or changed + deleted ≥ card threshold | `large-edit` |
//! | 6 | gap since previous entry ≥ session gap | `session-gap` |
//!
//! The edit score approximates how much text was touched: for every card
//! whose content changed, the longer of the old and new content; plus the
//! full content of added and deleted cards.

use std::collections::BTreeSet;

use crate::config::PromotionConfig;
use crate::model::{CardId, CardSnapshot, CardState, PromotionReason};

/// Everything the promotion rules look at for one candidate entry.
#[derive(Debug, Clone, Copy)]
pub struct PromotionInput<'a> {
    pub name: Option<&'a str>,
    pub timestamp_us: i64,
    pub previous: Option<&'a CardState>,
    pub current: &'a CardState,
    pub changed: &'a [CardSnapshot],
    pub deleted: &'a BTreeSet<CardId>,
    pub previous_timestamp_us: Option<i64>,
}

/// Evaluate the promotion rules. `None` means the entry is not promoted.
#[must_use]
pub fn evaluate(input: &PromotionInput<'_>, config: &PromotionConfig) -> Option<PromotionReason> {
    if input.name.is_some_and(|name| !name.trim().is_empty()) {
        return Some(PromotionReason::Named);
    }

    let Some(previous) = input.previous else {
        return Some(PromotionReason::Initial);
    };

    let added = input
        .changed
        .iter()
        .any(|snap| !previous.contains_key(&snap.id));
    if added || !input.deleted.is_empty() {
        return Some(PromotionReason::StructureAddDelete);
    }

    let moved = input.changed.iter().any(|snap| {
        let now = input.current.get(&snap.id).unwrap_or(snap);
        previous
            .get(&snap.id)
            .is_some_and(|before| before.structure_differs(now))
    });
    if moved {
        return Some(PromotionReason::StructureMove);
    }

    let touched = input.changed.len() + input.deleted.len();
    if edit_score(previous, input.current, input.changed, input.deleted) >= config.large_edit_score
        || touched >= config.large_edit_cards
    {
        return Some(PromotionReason::LargeEdit);
    }

    if let Some(prev_ts) = input.previous_timestamp_us
        && input.timestamp_us.saturating_sub(prev_ts) >= config.session_gap_us()
    {
        return Some(PromotionReason::SessionGap);
    }

    None
}

/// Character-count proxy for the size of an edit.
#[must_use]
pub fn edit_score(
    previous: &CardState,
    current: &CardState,
    changed: &[CardSnapshot],
    deleted: &BTreeSet<CardId>,
) -> usize {
    let mut score = 0;
    for snap in changed {
        let now = current.get(&snap.id).unwrap_or(snap);
        match previous.get(&snap.id) {
            Some(before) if before.content != now.content => {
                score += before.content_len().max(now.content_len());
            }
            Some(_) => {}
            None => score += now.content_len(),
        }
    }
    for id in deleted {
        if let Some(before) = previous.get(id) {
            score += before.content_len();
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MICROS_PER_MINUTE;
    use crate::model::{Card, state_of};

    fn state(cards: &[Card]) -> CardState {
        state_of(cards)
    }

    fn run(
        name: Option<&str>,
        previous: Option<&CardState>,
        current: &CardState,
        gap_us: i64,
    ) -> Option<PromotionReason> {
        let (changed, deleted) = match previous {
            Some(prev) => crate::history::builder::compute_delta(prev, current),
            None => (current.values().cloned().collect(), BTreeSet::new()),
        };
        evaluate(
            &PromotionInput {
                name,
                timestamp_us: gap_us,
                previous,
                current,
                changed: &changed,
                deleted: &deleted,
                previous_timestamp_us: previous.map(|_| 0),
            },
            &PromotionConfig::default(),
        )
    }

    #[test]
    fn name_wins_over_everything() {
        let cur = state(&[Card::new("a", "A")]);
        assert_eq!(run(Some("Draft"), None, &cur, 0), Some(PromotionReason::Named));
    }

    #[test]
    fn blank_name_is_not_a_name() {
        let cur = state(&[Card::new("a", "A")]);
        assert_eq!(run(Some("  "), None, &cur, 0), Some(PromotionReason::Initial));
    }

    #[test]
    fn first_entry_is_initial() {
        let cur = state(&[Card::new("a", "A")]);
        assert_eq!(run(None, None, &cur, 0), Some(PromotionReason::Initial));
    }

    #[test]
    fn add_and_delete_are_structural() {
        let prev = state(&[Card::new("a", "A")]);
        let added = state(&[Card::new("a", "A"), Card::new("b", "B").with_parent("a", 0)]);
        assert_eq!(
            run(None, Some(&prev), &added, 1),
            Some(PromotionReason::StructureAddDelete)
        );

        let removed = state(&[]);
        assert_eq!(
            run(None, Some(&prev), &removed, 1),
            Some(PromotionReason::StructureAddDelete)
        );
    }

    #[test]
    fn reorder_and_archive_are_moves() {
        let prev = state(&[Card::new("a", "A").with_parent("r", 0), Card::new("r", "R")]);
        let reordered = state(&[Card::new("a", "A").with_parent("r", 1), Card::new("r", "R")]);
        assert_eq!(
            run(None, Some(&prev), &reordered, 1),
            Some(PromotionReason::StructureMove)
        );

        let mut archived_card = Card::new("a", "A").with_parent("r", 0);
        archived_card.archived = true;
        let archived = state(&[archived_card, Card::new("r", "R")]);
        assert_eq!(
            run(None, Some(&prev), &archived, 1),
            Some(PromotionReason::StructureMove)
        );
    }

    #[test]
    fn small_edit_is_not_promoted() {
        let prev = state(&[Card::new("a", "A")]);
        let cur = state(&[Card::new("a", "AB")]);
        assert_eq!(run(None, Some(&prev), &cur, 1), None);
    }

    #[test]
    fn long_content_edit_is_large() {
        let prev = state(&[Card::new("a", "x".repeat(1199))]);
        let cur = state(&[Card::new("a", "y".repeat(1200))]);
        assert_eq!(
            run(None, Some(&prev), &cur, 1),
            Some(PromotionReason::LargeEdit)
        );
    }

    #[test]
    fn many_small_edits_are_large() {
        let ids: Vec<String> = (0..8).map(|i| format!("c{i}")).collect();
        let prev = state(&ids.iter().map(|id| Card::new(id.as_str(), "a")).collect::<Vec<_>>());
        let cur = state(&ids.iter().map(|id| Card::new(id.as_str(), "b")).collect::<Vec<_>>());
        assert_eq!(
            run(None, Some(&prev), &cur, 1),
            Some(PromotionReason::LargeEdit)
        );
    }

    #[test]
    fn session_gap_promotes_small_edit() {
        let prev = state(&[Card::new("a", "A")]);
        let cur = state(&[Card::new("a", "AB")]);
        assert_eq!(
            run(None, Some(&prev), &cur, 20 * MICROS_PER_MINUTE),
            Some(PromotionReason::SessionGap)
        );
        assert_eq!(run(None, Some(&prev), &cur, 14 * MICROS_PER_MINUTE), None);
    }

    #[test]
    fn edit_score_counts_longer_side_plus_adds_and_deletes() {
        let prev = state(&[Card::new("a", "abcd"), Card::new("gone", "xyz")]);
        let cur = state(&[Card::new("a", "ab"), Card::new("new", "12345")]);
        let (changed, deleted) = crate::history::builder::compute_delta(&prev, &cur);
        assert_eq!(edit_score(&prev, &cur, &changed, &deleted), 4 + 5 + 3);
    }
}
