use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::CardId;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    SnapshotNotFound,
    CardNotFound,
    CycleDetected,
    InvalidSequence,
    UnsupportedFormat,
    DocumentReadFailed,
    DocumentWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::SnapshotNotFound => "E2001",
            Self::CardNotFound => "E2002",
            Self::CycleDetected => "E2003",
            Self::InvalidSequence => "E3001",
            Self::UnsupportedFormat => "E3002",
            Self::DocumentReadFailed => "E5001",
            Self::DocumentWriteFailed => "E5002",
            Self::LockContention => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Document not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::SnapshotNotFound => "History snapshot not found",
            Self::CardNotFound => "Card not found",
            Self::CycleDetected => "Cycle would be created",
            Self::InvalidSequence => "History sequence violates an invariant",
            Self::UnsupportedFormat => "Unsupported document format version",
            Self::DocumentReadFailed => "Document read failed",
            Self::DocumentWriteFailed => "Document write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `ct init` to create a document."),
            Self::ConfigParseError => Some("Fix syntax in .cardtrail/config.toml and retry."),
            Self::SnapshotNotFound => Some("Run `ct log` to list valid history indices."),
            Self::CardNotFound => Some("Run `ct show <index>` to list card ids at a history point."),
            Self::CycleDetected => Some("A card cannot be moved under its own descendant."),
            Self::InvalidSequence => Some("Run `ct compact --force` to re-encode the history."),
            Self::UnsupportedFormat => Some("Upgrade cardtrail to read this document."),
            Self::DocumentReadFailed => Some("Check that the document path exists and is readable."),
            Self::DocumentWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `ct` process releases its lock."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Domain errors raised by history and document operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("no history entry at index {index} (history has {len} entries)")]
    SnapshotNotFound { index: usize, len: usize },

    #[error("card not found: '{0}'")]
    CardNotFound(CardId),

    #[error("moving '{card}' under '{parent}' would create a cycle")]
    CycleDetected { card: CardId, parent: CardId },

    #[error("invalid history sequence: {0}")]
    InvalidSequence(String),
}

impl HistoryError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SnapshotNotFound { .. } => ErrorCode::SnapshotNotFound,
            Self::CardNotFound(_) => ErrorCode::CardNotFound,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::InvalidSequence(_) => ErrorCode::InvalidSequence,
        }
    }
}

/// Failures while reading, writing or locking a persisted document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported document format version {found}: maximum supported is {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("lock timed out after {waited:?} at {path}")]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("document {path} does not exist")]
    Missing { path: PathBuf },
}

impl StoreError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } | Self::Json { .. } => ErrorCode::DocumentReadFailed,
            Self::Write { .. } => ErrorCode::DocumentWriteFailed,
            Self::UnsupportedVersion { .. } => ErrorCode::UnsupportedFormat,
            Self::LockTimeout { .. } => ErrorCode::LockContention,
            Self::Missing { .. } => ErrorCode::NotInitialized,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
