//! Value types for live cards and recorded history entries.

pub mod card;
pub mod snapshot;

pub use card::{Card, CardId, CardSnapshot, CardState, state_of};
pub use snapshot::{HistorySnapshot, PromotionReason, SnapshotId};
