//! `ct compact`: thin out old history.

use anyhow::Result;
use cardtrail_core::history::CompactionReport;
use clap::Args;
use serde::Serialize;
use std::io::Write;

use super::Context;
use crate::output::{pretty_kv, render};

#[derive(Args, Debug)]
pub struct CompactArgs {
    /// Compact even if the growth thresholds are not met.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct CompactOutput {
    ran: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<CompactionReport>,
}

pub fn run_compact(args: &CompactArgs, ctx: &Context) -> Result<()> {
    let report = ctx.write(|doc| Ok(doc.compact(args.force)))?;
    let out = CompactOutput {
        ran: report.is_some(),
        report,
    };
    render(ctx.output, &out, |o, w| match &o.report {
        None => writeln!(w, "compaction not needed; pass --force to run anyway"),
        Some(r) => {
            pretty_kv(w, "entries", format!("{} → {}", r.entries_before, r.entries_after))?;
            pretty_kv(w, "dropped", r.dropped_by_selection.to_string())?;
            pretty_kv(w, "empty", r.dropped_empty.to_string())?;
            pretty_kv(w, "full", r.full_entries.to_string())?;
            pretty_kv(w, "promoted", r.promoted_kept.to_string())
        }
    })
}
