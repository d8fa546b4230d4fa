use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::card::{CardId, CardSnapshot};

/// Identifier of one history entry. Survives compaction unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive an id as `hs-<12 hex>` from the entry's stamp and shape.
    #[must_use]
    pub fn derive(timestamp_us: i64, seq: u64, name: Option<&str>, card_count: usize) -> Self {
        let input = format!(
            "{timestamp_us}\t{seq}\t{}\t{card_count}\n",
            name.unwrap_or_default()
        );
        let hash = blake3::hash(input.as_bytes()).to_hex();
        Self(format!("hs-{}", &hash[..12]))
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an entry is permanently retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromotionReason {
    Named,
    Initial,
    StructureAddDelete,
    StructureMove,
    LargeEdit,
    SessionGap,
}

impl PromotionReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Named => "named",
            Self::Initial => "initial",
            Self::StructureAddDelete => "structure-add-delete",
            Self::StructureMove => "structure-move",
            Self::LargeEdit => "large-edit",
            Self::SessionGap => "session-gap",
        }
    }
}

impl fmt::Display for PromotionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a promotion reason from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid promotion reason: '{0}'")]
pub struct ParsePromotionReasonError(pub String);

impl FromStr for PromotionReason {
    type Err = ParsePromotionReasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "named" => Ok(Self::Named),
            "initial" => Ok(Self::Initial),
            "structure-add-delete" => Ok(Self::StructureAddDelete),
            "structure-move" => Ok(Self::StructureMove),
            "large-edit" => Ok(Self::LargeEdit),
            "session-gap" => Ok(Self::SessionGap),
            other => Err(ParsePromotionReasonError(other.to_string())),
        }
    }
}

/// One recorded point in edit history.
///
/// A full entry lists every card; a delta entry lists only the cards that
/// changed or appeared since the previous resolved state, plus the ids that
/// disappeared. Only `promoted`/`promotion` may change after construction,
/// and only from unpromoted to promoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub id: SnapshotId,
    /// Microseconds since the Unix epoch; strictly increasing along a sequence.
    pub timestamp_us: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_delta: bool,
    pub cards: Vec<CardSnapshot>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub deleted: BTreeSet<CardId>,
    #[serde(default)]
    pub promoted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<CardId>,
}

impl HistorySnapshot {
    #[must_use]
    pub const fn is_full(&self) -> bool {
        !self.is_delta
    }

    /// True for a delta that records no change at all.
    #[must_use]
    pub fn is_empty_delta(&self) -> bool {
        self.is_delta && self.cards.is_empty() && self.deleted.is_empty()
    }

    /// Mark this entry as permanently retained.
    ///
    /// An existing promotion is never replaced or cleared.
    pub fn promote(&mut self, reason: PromotionReason) {
        if self.promoted {
            return;
        }
        self.promoted = true;
        self.promotion = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> HistorySnapshot {
        HistorySnapshot {
            id: SnapshotId::new("hs-test"),
            timestamp_us: 1,
            name: None,
            is_delta: true,
            cards: Vec::new(),
            deleted: BTreeSet::new(),
            promoted: false,
            promotion: None,
            note: None,
        }
    }

    #[test]
    fn promote_is_sticky() {
        let mut e = entry();
        e.promote(PromotionReason::SessionGap);
        e.promote(PromotionReason::Named);
        assert!(e.promoted);
        assert_eq!(e.promotion, Some(PromotionReason::SessionGap));
    }

    #[test]
    fn empty_delta_detection() {
        let mut e = entry();
        assert!(e.is_empty_delta());
        e.is_delta = false;
        assert!(!e.is_empty_delta());
    }

    #[test]
    fn promotion_reason_round_trips_through_text() {
        for reason in [
            PromotionReason::Named,
            PromotionReason::Initial,
            PromotionReason::StructureAddDelete,
            PromotionReason::StructureMove,
            PromotionReason::LargeEdit,
            PromotionReason::SessionGap,
        ] {
            assert_eq!(reason.as_str().parse::<PromotionReason>(), Ok(reason));
            let json = serde_json::to_string(&reason).expect("serialize");
            assert_eq!(json, format!("\"{}\"", reason.as_str()));
        }
        assert!("bogus".parse::<PromotionReason>().is_err());
    }

    #[test]
    fn snapshot_ids_are_prefixed_and_stable() {
        let a = SnapshotId::derive(10, 1, Some("Draft 1"), 4);
        let b = SnapshotId::derive(10, 1, Some("Draft 1"), 4);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("hs-"));
        assert_ne!(a, SnapshotId::derive(10, 2, Some("Draft 1"), 4));
    }
}
