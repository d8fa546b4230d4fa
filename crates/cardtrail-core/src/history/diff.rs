//! Field-level comparison of two resolved states.

use serde::Serialize;

use crate::model::{CardId, CardSnapshot, CardState};

/// Which field of a card changed between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChange {
    Content,
    Parent,
    Order,
    Category,
    Floating,
    Archived,
    CloneGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardChange {
    pub id: CardId,
    pub fields: Vec<FieldChange>,
    pub before: CardSnapshot,
    pub after: CardSnapshot,
}

/// Difference between a `before` and an `after` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateDiff {
    pub added: Vec<CardSnapshot>,
    pub removed: Vec<CardSnapshot>,
    pub changed: Vec<CardChange>,
}

impl StateDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

#[must_use]
pub fn changed_fields(before: &CardSnapshot, after: &CardSnapshot) -> Vec<FieldChange> {
    let mut fields = Vec::new();
    if before.content != after.content {
        fields.push(FieldChange::Content);
    }
    if before.parent != after.parent {
        fields.push(FieldChange::Parent);
    }
    if before.order != after.order {
        fields.push(FieldChange::Order);
    }
    if before.category != after.category {
        fields.push(FieldChange::Category);
    }
    if before.floating != after.floating {
        fields.push(FieldChange::Floating);
    }
    if before.archived != after.archived {
        fields.push(FieldChange::Archived);
    }
    if before.clone_group != after.clone_group {
        fields.push(FieldChange::CloneGroup);
    }
    fields
}

/// Compare two states. All lists are in id order.
#[must_use]
pub fn diff_states(before: &CardState, after: &CardState) -> StateDiff {
    let mut diff = StateDiff::default();
    for (id, snap) in after {
        match before.get(id) {
            None => diff.added.push(snap.clone()),
            Some(prev) if prev != snap => diff.changed.push(CardChange {
                id: id.clone(),
                fields: changed_fields(prev, snap),
                before: prev.clone(),
                after: snap.clone(),
            }),
            Some(_) => {}
        }
    }
    diff.removed = before
        .iter()
        .filter(|(id, _)| !after.contains_key(*id))
        .map(|(_, snap)| snap.clone())
        .collect();
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, state_of};

    #[test]
    fn diff_reports_adds_removes_and_fields() {
        let before = state_of(&[Card::new("a", "A"), Card::new("gone", "G")]);
        let mut moved = Card::new("a", "A2").with_parent("new", 2);
        moved.archived = true;
        let after = state_of(&[moved, Card::new("new", "N")]);

        let diff = diff_states(&before, &after);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].id.as_str(), "new");
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].id.as_str(), "gone");
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(
            diff.changed[0].fields,
            vec![
                FieldChange::Content,
                FieldChange::Parent,
                FieldChange::Order,
                FieldChange::Archived
            ]
        );
    }

    #[test]
    fn identical_states_have_empty_diff() {
        let state = state_of(&[Card::new("a", "A")]);
        assert!(diff_states(&state, &state).is_empty());
    }
}
