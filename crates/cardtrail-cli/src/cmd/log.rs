//! `ct log`: list history entries, oldest first.

use anyhow::Result;
use cardtrail_core::model::HistorySnapshot;
use clap::Args;
use serde::Serialize;
use std::io::Write;

use super::Context;
use crate::output::{local_time, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Show only the newest N entries.
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only promoted entries.
    #[arg(long)]
    pub promoted: bool,
}

#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub index: usize,
    pub id: String,
    pub timestamp_us: i64,
    pub kind: &'static str,
    pub cards: usize,
    pub deleted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LogEntry {
    fn from_entry(index: usize, entry: &HistorySnapshot) -> Self {
        Self {
            index,
            id: entry.id.to_string(),
            timestamp_us: entry.timestamp_us,
            kind: if entry.is_delta { "delta" } else { "full" },
            cards: entry.cards.len(),
            deleted: entry.deleted.len(),
            promotion: entry.promotion.map(|r| r.as_str()),
            name: entry.name.clone(),
        }
    }
}

pub fn run_log(args: &LogArgs, ctx: &Context) -> Result<()> {
    let entries: Vec<LogEntry> = ctx.read(|doc| {
        let all = doc.history().entries();
        let skip = args
            .limit
            .map_or(0, |limit| all.len().saturating_sub(limit));
        Ok(all
            .iter()
            .enumerate()
            .skip(skip)
            .filter(|(_, e)| !args.promoted || e.promoted)
            .map(|(index, e)| LogEntry::from_entry(index, e))
            .collect())
    })?;

    render_mode(ctx.output, &entries, |e, w| render_log_text(e, w), |e, w| render_log_human(e, w))
}

fn render_log_text(entries: &[LogEntry], w: &mut dyn Write) -> std::io::Result<()> {
    for e in entries {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            e.index,
            e.id,
            e.timestamp_us,
            e.kind,
            e.promotion.unwrap_or("-"),
            e.name.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}

fn render_log_human(entries: &[LogEntry], w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("History ({} entries)", entries.len()))?;
    for e in entries {
        let marker = if e.promotion.is_some() { '*' } else { ' ' };
        write!(
            w,
            "{marker}{:>5}  {}  {:<5}  {:>4} cards",
            e.index,
            local_time(e.timestamp_us),
            e.kind,
            e.cards
        )?;
        if e.deleted > 0 {
            write!(w, ", {} deleted", e.deleted)?;
        }
        if let Some(reason) = e.promotion {
            write!(w, "  [{reason}]")?;
        }
        if let Some(name) = &e.name {
            write!(w, "  \"{name}\"")?;
        }
        writeln!(w)?;
    }
    Ok(())
}
