//! Subcommand handlers and the document plumbing they share.

pub mod add;
pub mod archive;
pub mod compact;
pub mod completions;
pub mod diff;
pub mod edit;
pub mod init;
pub mod log;
pub mod move_cmd;
pub mod restore;
pub mod rm;
pub mod show;
pub mod snapshot;
pub mod verify;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use cardtrail_core::clock::SystemClock;
use cardtrail_core::config::{HistoryConfig, load_history_config};
use cardtrail_core::model::CardId;
use cardtrail_core::store::lock::{DocumentLock, DocumentReadLock};
use cardtrail_core::store::{load_document, lock_path, save_document};
use cardtrail_core::{Document, ErrorCode, HistoryError, SnapshotReceipt, StoreError};
use serde::Serialize;

use crate::output::{CliError, OutputMode, pretty_kv, render, render_error};

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the document lives and how results are printed.
#[derive(Debug, Clone)]
pub struct Context {
    pub file: PathBuf,
    pub output: OutputMode,
}

impl Context {
    /// Directory holding the document; `.cardtrail/config.toml` is read from here.
    pub fn project_root(&self) -> PathBuf {
        self.file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    pub fn config(&self) -> Result<HistoryConfig> {
        load_history_config(&self.project_root()).map_err(|e| {
            self.fail(&CliError::with_code(format!("{e:#}"), ErrorCode::ConfigParseError))
        })
    }

    /// Render `error` and turn it into the command's failure.
    pub fn fail(&self, error: &CliError) -> anyhow::Error {
        if let Err(render_err) = render_error(self.output, error) {
            return render_err;
        }
        anyhow::anyhow!("{}", error.message)
    }

    pub fn store_error(&self, err: &StoreError) -> anyhow::Error {
        self.fail(&CliError::with_code(err.to_string(), err.code()))
    }

    pub fn history_error(&self, err: &HistoryError) -> anyhow::Error {
        self.fail(&CliError::with_code(err.to_string(), err.code()))
    }

    fn load(&self) -> Result<Document> {
        let config = self.config()?;
        load_document(&self.file, config, SystemClock).map_err(|e| self.store_error(&e))
    }

    /// Run `f` against the document under a shared lock.
    pub fn read<T>(&self, f: impl FnOnce(&Document) -> Result<T>) -> Result<T> {
        let _lock = DocumentReadLock::acquire(&lock_path(&self.file), LOCK_TIMEOUT)
            .map_err(|e| self.store_error(&e))?;
        let doc = self.load()?;
        f(&doc)
    }

    /// Run `f` against the document under the exclusive lock and save it
    /// afterward. Nothing is written when `f` fails.
    pub fn write<T>(&self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let _lock = DocumentLock::acquire(&lock_path(&self.file), LOCK_TIMEOUT)
            .map_err(|e| self.store_error(&e))?;
        let mut doc = self.load()?;
        let value = f(&mut doc)?;
        save_document(&self.file, &doc).map_err(|e| self.store_error(&e))?;
        Ok(value)
    }
}

/// Resolve a user-supplied card id: exact, with the `c-` prefix added, or a
/// unique prefix.
pub fn resolve_card(doc: &Document, raw: &str) -> Result<CardId, HistoryError> {
    let exact = CardId::new(raw);
    if doc.card(&exact).is_some() {
        return Ok(exact);
    }
    let prefixed = if raw.starts_with("c-") {
        raw.to_string()
    } else {
        format!("c-{raw}")
    };
    let mut matches = doc
        .cards()
        .filter(|c| c.id.as_str().starts_with(&prefixed))
        .map(|c| c.id.clone());
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        _ => Err(HistoryError::CardNotFound(exact)),
    }
}

/// Result of an editing command: the card touched and the snapshot taken.
#[derive(Debug, Serialize)]
pub struct EditOutcome {
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<CardId>,
    pub snapshot: SnapshotReceipt,
}

impl EditOutcome {
    /// Record the edit in history and describe it.
    pub fn record(doc: &mut Document, action: &'static str, card: Option<CardId>) -> Self {
        let snapshot = doc.take_snapshot(false, None, None);
        tracing::debug!(action, appended = snapshot.appended.len(), "edit recorded");
        Self {
            action,
            card,
            removed: Vec::new(),
            snapshot,
        }
    }

    pub fn render(&self, output: OutputMode) -> Result<()> {
        render(output, self, |outcome, w| write_edit(outcome, w))
    }
}

fn write_edit(outcome: &EditOutcome, w: &mut dyn Write) -> std::io::Result<()> {
    match &outcome.card {
        Some(card) => writeln!(w, "{} {card}", outcome.action)?,
        None => writeln!(w, "{}", outcome.action)?,
    }
    for id in &outcome.removed {
        writeln!(w, "  removed {id}")?;
    }
    write_receipt(&outcome.snapshot, w)
}

/// Shared text rendering of a snapshot receipt.
pub fn write_receipt(receipt: &SnapshotReceipt, w: &mut dyn Write) -> std::io::Result<()> {
    if receipt.is_noop() {
        writeln!(w, "  no changes; no snapshot recorded")?;
    }
    for id in &receipt.appended {
        writeln!(w, "  snapshot {id}")?;
    }
    if let Some(report) = &receipt.compaction {
        pretty_kv(
            w,
            "  compacted",
            format!("{} → {} entries", report.entries_before, report.entries_after),
        )?;
    }
    Ok(())
}
