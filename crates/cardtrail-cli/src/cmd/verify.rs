//! `ct verify`: check the stored history for structural problems.

use anyhow::Result;
use cardtrail_core::ErrorCode;
use cardtrail_core::clock::{Clock, SystemClock};
use cardtrail_core::history::compact::{compact_entries, select_retained, verify_compaction};
use cardtrail_core::history::verify::Violation;
use clap::Args;
use serde::Serialize;
use std::io::Write;

use super::Context;
use crate::output::{CliError, pretty_kv, render};

#[derive(Args, Debug)]
pub struct VerifyArgs {}

#[derive(Debug, Serialize)]
struct VerifyReport {
    entries: usize,
    violations: Vec<Violation>,
    /// The newest entry resolves to the live cards.
    latest_matches_live: bool,
    /// A compaction run now would preserve every retained state.
    compaction_safe: bool,
}

impl VerifyReport {
    fn ok(&self) -> bool {
        self.violations.is_empty() && self.latest_matches_live && self.compaction_safe
    }
}

pub fn run_verify(_args: &VerifyArgs, ctx: &Context) -> Result<()> {
    let report = ctx.read(|doc| {
        let history = doc.history();
        let config = doc.config();
        let now = SystemClock.now_us();
        let retained = select_retained(history.entries(), now, &config.retention);
        let (rebuilt, _) = compact_entries(history.entries(), now, config);
        Ok(VerifyReport {
            entries: history.len(),
            violations: history.validate(config),
            latest_matches_live: history.is_empty()
                || history.latest_state() == Some(doc.current_state()),
            compaction_safe: verify_compaction(history.entries(), &retained, &rebuilt),
        })
    })?;

    render(ctx.output, &report, |r, w| {
        pretty_kv(w, "entries", r.entries.to_string())?;
        for v in &r.violations {
            writeln!(w, "  violation: {v}")?;
        }
        if !r.latest_matches_live {
            writeln!(w, "  live cards differ from the newest entry; run `ct snapshot`")?;
        }
        if !r.compaction_safe {
            writeln!(w, "  compaction would alter a retained state")?;
        }
        pretty_kv(w, "status", if r.ok() { "ok" } else { "failed" })
    })?;

    if report.ok() {
        Ok(())
    } else {
        Err(ctx.fail(&CliError::with_code(
            "history verification failed",
            ErrorCode::InvalidSequence,
        )))
    }
}
