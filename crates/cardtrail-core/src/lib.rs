//! cardtrail-core library.
//!
//! Snapshot history for hierarchical card documents: full/delta encoding,
//! promotion, state resolution, age-tiered compaction and restore.

pub mod clock;
pub mod config;
pub mod document;
pub mod error;
pub mod history;
pub mod model;
pub mod store;

/// # Conventions
///
/// - **Errors**: Domain failures use `thiserror` enums from [`error`]; glue
///   code returns `anyhow::Result`.
/// - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
/// - **Time**: All timestamps are microseconds since the Unix epoch.
pub use document::{Document, RestoreReceipt, SnapshotReceipt};
pub use error::{ErrorCode, HistoryError, StoreError};
