//! A card document: the live card set plus its owned history.
//!
//! Editing collaborators mutate the live cards through the helpers here and
//! call [`Document::take_snapshot`] when a point in time should be
//! recorded. Every history operation is a method on this value, so each
//! document (and each test) has an independent history.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use crate::clock::{Clock, SystemClock, to_datetime};
use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::history::diff::{StateDiff, diff_states};
use crate::history::{CompactionReport, History, SnapshotRequest};
use crate::model::{Card, CardId, CardSnapshot, CardState, SnapshotId};

/// What a snapshot request appended, and whether it triggered compaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotReceipt {
    pub appended: Vec<SnapshotId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compaction: Option<CompactionReport>,
}

impl SnapshotReceipt {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.appended.is_empty()
    }
}

/// Outcome of [`Document::restore_to_state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReceipt {
    pub restored_from: SnapshotId,
    pub safety: SnapshotReceipt,
    pub after: SnapshotReceipt,
    pub cards: usize,
}

#[derive(Debug, Clone)]
pub struct Document {
    cards: BTreeMap<CardId, Card>,
    history: History,
    config: HistoryConfig,
    clock: Arc<dyn Clock>,
    card_seq: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(HistoryConfig::default(), SystemClock)
    }
}

impl Document {
    pub fn new(config: HistoryConfig, clock: impl Clock + 'static) -> Self {
        Self {
            cards: BTreeMap::new(),
            history: History::new(),
            config,
            clock: Arc::new(clock),
            card_seq: 0,
        }
    }

    /// Reassemble a document from persisted parts.
    pub fn from_parts(
        cards: Vec<Card>,
        history: History,
        config: HistoryConfig,
        clock: impl Clock + 'static,
    ) -> Self {
        let card_seq = cards.len() as u64;
        Self {
            cards: cards.into_iter().map(|c| (c.id.clone(), c)).collect(),
            history,
            config,
            clock: Arc::new(clock),
            card_seq,
        }
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub const fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    #[must_use]
    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    /// Snapshot map of the live cards.
    #[must_use]
    pub fn current_state(&self) -> CardState {
        crate::model::state_of(self.cards.values())
    }

    // -----------------------------------------------------------------------
    // History operations
    // -----------------------------------------------------------------------

    /// Record the live state, then run threshold-gated compaction.
    ///
    /// A named snapshot is always full and promoted, and is followed by an
    /// unnamed companion entry representing the current state.
    pub fn take_snapshot(
        &mut self,
        force_full: bool,
        name: Option<&str>,
        note: Option<CardId>,
    ) -> SnapshotReceipt {
        self.take_snapshot_with(&SnapshotRequest {
            name: name.map(str::to_string),
            force_full,
            allow_empty: false,
            note,
        })
    }

    pub fn take_snapshot_with(&mut self, request: &SnapshotRequest) -> SnapshotReceipt {
        let now = self.clock.now_us();
        let current = self.current_state();
        let appended: Vec<SnapshotId> = self
            .history
            .record(&current, request, now, &self.config)
            .into_iter()
            .filter_map(|index| self.history.get(index).map(|e| e.id.clone()))
            .collect();

        let compaction = if appended.is_empty() {
            None
        } else {
            self.history.compact(now, &self.config, false)
        };
        SnapshotReceipt {
            appended,
            compaction,
        }
    }

    /// Cards at `index` in tree order, or `None` when out of range.
    #[must_use]
    pub fn resolve_state(&self, index: usize) -> Option<Vec<CardSnapshot>> {
        self.history.resolve_ordered(index)
    }

    /// Like [`Self::resolve_state`] but reports a missing index as an error.
    ///
    /// # Errors
    ///
    /// [`HistoryError::SnapshotNotFound`] when `index` is out of range.
    pub fn resolve_state_checked(&self, index: usize) -> Result<Vec<CardSnapshot>, HistoryError> {
        self.resolve_state(index).ok_or(HistoryError::SnapshotNotFound {
            index,
            len: self.history.len(),
        })
    }

    /// Run compaction now (when forced) or if the growth thresholds are met.
    ///
    /// The sequence may shrink; callers must re-clamp any index they track.
    pub fn compact(&mut self, force: bool) -> Option<CompactionReport> {
        let now = self.clock.now_us();
        self.history.compact(now, &self.config, force)
    }

    /// Replace the live cards with the state at `index`.
    ///
    /// A named safety snapshot of the current cards is taken first, and an
    /// unnamed snapshot of the restored cards afterward.
    ///
    /// # Errors
    ///
    /// [`HistoryError::SnapshotNotFound`] when `index` is out of range; the
    /// document is left untouched.
    pub fn restore_to_state(&mut self, index: usize) -> Result<RestoreReceipt, HistoryError> {
        // Resolve first: the safety snapshot may compact and shift indices.
        let (Some(entry), Some(target)) = (self.history.get(index), self.history.resolve(index))
        else {
            return Err(HistoryError::SnapshotNotFound {
                index,
                len: self.history.len(),
            });
        };
        let source = entry.id.clone();
        let label = to_datetime(entry.timestamp_us).map_or_else(
            || format!("Before restore to {source}"),
            |at| format!("Before restore to {}", at.format("%Y-%m-%d %H:%M:%S")),
        );

        let safety = self.take_snapshot_with(&SnapshotRequest::named(label));

        let now = self.clock.now_us();
        let restored: BTreeMap<CardId, Card> = target
            .values()
            .map(|snap| {
                let created = self.cards.get(&snap.id).map_or(now, |c| c.created_at_us);
                (snap.id.clone(), Card::from_snapshot(snap, created))
            })
            .collect();
        self.cards = restored;

        let after = self.take_snapshot_with(&SnapshotRequest::default());
        tracing::info!(
            index,
            source = %source,
            cards = self.cards.len(),
            "document restored to history point"
        );
        Ok(RestoreReceipt {
            restored_from: source,
            safety,
            after,
            cards: self.cards.len(),
        })
    }

    /// Field-level diff between two history points.
    ///
    /// # Errors
    ///
    /// [`HistoryError::SnapshotNotFound`] when either index is out of range.
    pub fn diff(&self, from: usize, to: usize) -> Result<StateDiff, HistoryError> {
        let len = self.history.len();
        let before = self
            .history
            .resolve(from)
            .ok_or(HistoryError::SnapshotNotFound { index: from, len })?;
        let after = self
            .history
            .resolve(to)
            .ok_or(HistoryError::SnapshotNotFound { index: to, len })?;
        Ok(diff_states(&before, &after))
    }

    // -----------------------------------------------------------------------
    // Live card editing
    // -----------------------------------------------------------------------

    /// Add a card and return its new id. Without an explicit order the card
    /// goes after its last sibling.
    ///
    /// # Errors
    ///
    /// [`HistoryError::CardNotFound`] when `parent` does not exist.
    pub fn add_card(
        &mut self,
        content: impl Into<String>,
        parent: Option<CardId>,
        category: impl Into<String>,
        order: Option<i64>,
    ) -> Result<CardId, HistoryError> {
        if let Some(p) = &parent
            && !self.cards.contains_key(p)
        {
            return Err(HistoryError::CardNotFound(p.clone()));
        }
        let content = content.into();
        let now = self.clock.now_us();
        let mut id = CardId::derive(now, self.card_seq, &content);
        while self.cards.contains_key(&id) {
            self.card_seq += 1;
            id = CardId::derive(now, self.card_seq, &content);
        }
        self.card_seq += 1;

        let order = order.unwrap_or_else(|| self.next_order(parent.as_ref()));
        let card = Card {
            id: id.clone(),
            content,
            parent,
            order,
            category: category.into(),
            floating: false,
            archived: false,
            clone_group: None,
            created_at_us: now,
        };
        self.cards.insert(id.clone(), card);
        Ok(id)
    }

    /// Insert a fully specified card, replacing any card with the same id.
    pub fn insert_card(&mut self, card: Card) {
        self.cards.insert(card.id.clone(), card);
    }

    /// # Errors
    ///
    /// [`HistoryError::CardNotFound`] when `id` does not exist.
    pub fn edit_content(&mut self, id: &CardId, content: impl Into<String>) -> Result<(), HistoryError> {
        self.card_mut(id)?.content = content.into();
        Ok(())
    }

    /// Re-parent and/or re-order a card.
    ///
    /// # Errors
    ///
    /// [`HistoryError::CardNotFound`] for an unknown card or parent, and
    /// [`HistoryError::CycleDetected`] when `parent` is the card itself or
    /// one of its descendants.
    pub fn move_card(
        &mut self,
        id: &CardId,
        parent: Option<CardId>,
        order: Option<i64>,
    ) -> Result<(), HistoryError> {
        if !self.cards.contains_key(id) {
            return Err(HistoryError::CardNotFound(id.clone()));
        }
        if let Some(p) = &parent {
            if !self.cards.contains_key(p) {
                return Err(HistoryError::CardNotFound(p.clone()));
            }
            if self.is_self_or_descendant(p, id) {
                return Err(HistoryError::CycleDetected {
                    card: id.clone(),
                    parent: p.clone(),
                });
            }
        }
        let order = order.unwrap_or_else(|| self.next_order(parent.as_ref()));
        let card = self.card_mut(id)?;
        card.parent = parent;
        card.order = order;
        Ok(())
    }

    /// # Errors
    ///
    /// [`HistoryError::CardNotFound`] when `id` does not exist.
    pub fn set_category(&mut self, id: &CardId, category: impl Into<String>) -> Result<(), HistoryError> {
        self.card_mut(id)?.category = category.into();
        Ok(())
    }

    /// # Errors
    ///
    /// [`HistoryError::CardNotFound`] when `id` does not exist.
    pub fn set_floating(&mut self, id: &CardId, floating: bool) -> Result<(), HistoryError> {
        self.card_mut(id)?.floating = floating;
        Ok(())
    }

    /// # Errors
    ///
    /// [`HistoryError::CardNotFound`] when `id` does not exist.
    pub fn set_archived(&mut self, id: &CardId, archived: bool) -> Result<(), HistoryError> {
        self.card_mut(id)?.archived = archived;
        Ok(())
    }

    /// # Errors
    ///
    /// [`HistoryError::CardNotFound`] when `id` does not exist.
    pub fn set_clone_group(&mut self, id: &CardId, group: Option<String>) -> Result<(), HistoryError> {
        self.card_mut(id)?.clone_group = group;
        Ok(())
    }

    /// Remove a card and all of its descendants. Returns the removed ids.
    ///
    /// # Errors
    ///
    /// [`HistoryError::CardNotFound`] when `id` does not exist.
    pub fn remove_card(&mut self, id: &CardId) -> Result<Vec<CardId>, HistoryError> {
        if !self.cards.contains_key(id) {
            return Err(HistoryError::CardNotFound(id.clone()));
        }
        let mut children: BTreeMap<&CardId, Vec<&CardId>> = BTreeMap::new();
        for card in self.cards.values() {
            if let Some(parent) = &card.parent {
                children.entry(parent).or_default().push(&card.id);
            }
        }

        let mut doomed: Vec<CardId> = Vec::new();
        let mut seen: HashSet<&CardId> = HashSet::new();
        let mut queue: VecDeque<&CardId> = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            doomed.push(next.clone());
            if let Some(kids) = children.get(next) {
                queue.extend(kids.iter().copied());
            }
        }

        for gone in &doomed {
            self.cards.remove(gone);
        }
        Ok(doomed)
    }

    fn card_mut(&mut self, id: &CardId) -> Result<&mut Card, HistoryError> {
        self.cards
            .get_mut(id)
            .ok_or_else(|| HistoryError::CardNotFound(id.clone()))
    }

    fn next_order(&self, parent: Option<&CardId>) -> i64 {
        self.cards
            .values()
            .filter(|c| c.parent.as_ref() == parent)
            .map(|c| c.order)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// True when `candidate` is `ancestor` or lies beneath it.
    fn is_self_or_descendant(&self, candidate: &CardId, ancestor: &CardId) -> bool {
        let mut seen: HashSet<&CardId> = HashSet::new();
        let mut cursor = Some(candidate);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            cursor = self.cards.get(id).and_then(|c| c.parent.as_ref());
        }
        false
    }
}
