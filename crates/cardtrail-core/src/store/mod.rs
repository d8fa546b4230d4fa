//! On-disk persistence for a [`Document`].
//!
//! A document file is a single JSON envelope carrying a format version, the
//! live cards and the full history. Writes go to a sibling temp file that is
//! then renamed over the target, so readers never see a half-written file.

pub mod lock;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::HistoryConfig;
use crate::document::Document;
use crate::error::StoreError;
use crate::history::History;
use crate::model::Card;

/// Newest envelope version this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    cards: Vec<&'a Card>,
    history: &'a History,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u32,
    #[serde(default)]
    cards: Vec<Card>,
    #[serde(default)]
    history: History,
}

/// Advisory lock path guarding `document_path`.
#[must_use]
pub fn lock_path(document_path: &Path) -> PathBuf {
    sibling(document_path, "lock")
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

/// Persist `document` at `path`, replacing any existing file.
///
/// # Errors
///
/// [`StoreError::Write`] when the temp file cannot be written or renamed and
/// [`StoreError::Json`] when encoding fails.
pub fn save_document(path: &Path, document: &Document) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| StoreError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let envelope = EnvelopeRef {
        format_version: FORMAT_VERSION,
        cards: document.cards().collect(),
        history: document.history(),
    };
    let bytes = serde_json::to_vec_pretty(&envelope).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = sibling(path, "tmp");
    fs::write(&tmp, &bytes).map_err(|source| StoreError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        path = %path.display(),
        bytes = bytes.len(),
        entries = document.history().len(),
        "document saved"
    );
    Ok(())
}

/// Load the document at `path`.
///
/// # Errors
///
/// [`StoreError::Missing`] when the file does not exist,
/// [`StoreError::Read`] when it cannot be read,
/// [`StoreError::Json`] when it cannot be decoded and
/// [`StoreError::UnsupportedVersion`] for envelopes newer than this build.
pub fn load_document(
    path: &Path,
    config: HistoryConfig,
    clock: impl Clock + 'static,
) -> Result<Document, StoreError> {
    if !path.exists() {
        return Err(StoreError::Missing {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let envelope: Envelope = serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if envelope.format_version > FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: envelope.format_version,
            supported: FORMAT_VERSION,
        });
    }

    let violations = envelope.history.validate(&config);
    if !violations.is_empty() {
        tracing::warn!(
            path = %path.display(),
            count = violations.len(),
            "loaded history violates sequence invariants; run `ct verify`"
        );
    }

    Ok(Document::from_parts(envelope.cards, envelope.history, config, clock))
}
