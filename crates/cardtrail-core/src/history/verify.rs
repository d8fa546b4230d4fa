//! Structural checks over a history sequence.
//!
//! A valid sequence starts with a full entry, has strictly increasing
//! timestamps, and never runs more than the checkpoint interval of deltas
//! in a row. The checker reports every violation instead of stopping at the
//! first, so `ct verify` can print a complete picture.

use serde::Serialize;
use std::fmt;

use crate::model::HistorySnapshot;

/// One broken invariant, located by entry index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    FirstEntryNotFull,
    TimestampNotIncreasing { index: usize, previous_us: i64, timestamp_us: i64 },
    DeltaRunTooLong { index: usize, run: usize, limit: usize },
    DuplicateId { index: usize, id: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstEntryNotFull => write!(f, "entry 0 is a delta; the first entry must be full"),
            Self::TimestampNotIncreasing {
                index,
                previous_us,
                timestamp_us,
            } => write!(
                f,
                "entry {index} timestamp {timestamp_us} does not follow {previous_us}"
            ),
            Self::DeltaRunTooLong { index, run, limit } => write!(
                f,
                "entry {index} extends a delta run to {run} (limit {limit})"
            ),
            Self::DuplicateId { index, id } => write!(f, "entry {index} reuses id {id}"),
        }
    }
}

/// Check `entries` against the sequence invariants.
#[must_use]
pub fn validate(entries: &[HistorySnapshot], checkpoint_interval: usize) -> Vec<Violation> {
    let mut violations = Vec::new();
    if entries.first().is_some_and(|e| e.is_delta) {
        violations.push(Violation::FirstEntryNotFull);
    }

    let mut seen = std::collections::HashSet::with_capacity(entries.len());
    let mut run = 0;
    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            let previous_us = entries[index - 1].timestamp_us;
            if entry.timestamp_us <= previous_us {
                violations.push(Violation::TimestampNotIncreasing {
                    index,
                    previous_us,
                    timestamp_us: entry.timestamp_us,
                });
            }
        }

        if entry.is_delta {
            run += 1;
            if run > checkpoint_interval {
                violations.push(Violation::DeltaRunTooLong {
                    index,
                    run,
                    limit: checkpoint_interval,
                });
            }
        } else {
            run = 0;
        }

        if !seen.insert(entry.id.as_str()) {
            violations.push(Violation::DuplicateId {
                index,
                id: entry.id.to_string(),
            });
        }
    }
    violations
}
