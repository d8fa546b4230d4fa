use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier of a card within one document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a fresh id from creation metadata.
    ///
    /// Format: `c-<10 hex>` taken from a blake3 digest, so two cards created
    /// in the same microsecond still differ via `seq`.
    #[must_use]
    pub fn derive(created_at_us: i64, seq: u64, content: &str) -> Self {
        let input = format!("{created_at_us}\t{seq}\t{content}\n");
        let hash = blake3::hash(input.as_bytes()).to_hex();
        Self(format!("c-{}", &hash[..10]))
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A live, mutable card owned by the document.
///
/// `parent` is a relation only: children are found by grouping cards on
/// their parent id at use time, never through back-pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub content: String,
    #[serde(default)]
    pub parent: Option<CardId>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub floating: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub clone_group: Option<String>,
    /// Creation time in microseconds since the Unix epoch.
    #[serde(default)]
    pub created_at_us: i64,
}

impl Card {
    pub fn new(id: impl Into<CardId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            parent: None,
            order: 0,
            category: String::new(),
            floating: false,
            archived: false,
            clone_group: None,
            created_at_us: 0,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<CardId>, order: i64) -> Self {
        self.parent = Some(parent.into());
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Immutable value view of this card's history-relevant fields.
    #[must_use]
    pub fn snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            id: self.id.clone(),
            parent: self.parent.clone(),
            order: self.order,
            content: self.content.clone(),
            category: self.category.clone(),
            floating: self.floating,
            archived: self.archived,
            clone_group: self.clone_group.clone(),
        }
    }

    /// Rebuild a live card from a historical snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &CardSnapshot, created_at_us: i64) -> Self {
        Self {
            id: snapshot.id.clone(),
            content: snapshot.content.clone(),
            parent: snapshot.parent.clone(),
            order: snapshot.order,
            category: snapshot.category.clone(),
            floating: snapshot.floating,
            archived: snapshot.archived,
            clone_group: snapshot.clone_group.clone(),
            created_at_us,
        }
    }
}

impl From<String> for CardId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One card's fields frozen at a point in history. Value-equal on every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub id: CardId,
    #[serde(default)]
    pub parent: Option<CardId>,
    #[serde(default)]
    pub order: i64,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub floating: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub clone_group: Option<String>,
}

impl CardSnapshot {
    /// True when any placement or classification field differs from `other`.
    ///
    /// Content is not compared; this is the "structure-move" test.
    #[must_use]
    pub fn structure_differs(&self, other: &Self) -> bool {
        self.parent != other.parent
            || self.order != other.order
            || self.category != other.category
            || self.floating != other.floating
            || self.archived != other.archived
            || self.clone_group != other.clone_group
    }

    /// Content length in Unicode scalar values.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Fully resolved state at one history point: card id → snapshot.
pub type CardState = BTreeMap<CardId, CardSnapshot>;

/// Collect snapshots of a live card set into a [`CardState`].
pub fn state_of<'a>(cards: impl IntoIterator<Item = &'a Card>) -> CardState {
    cards
        .into_iter()
        .map(|card| (card.id.clone(), card.snapshot()))
        .collect()
}
