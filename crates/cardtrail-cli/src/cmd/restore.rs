//! `ct restore`: bring back the cards from an earlier history point.

use anyhow::Result;
use clap::Args;
use std::io::Write;

use super::{Context, write_receipt};
use crate::output::{pretty_kv, render};

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// History index as listed by `ct log`.
    pub index: usize,
}

pub fn run_restore(args: &RestoreArgs, ctx: &Context) -> Result<()> {
    let receipt = ctx.write(|doc| {
        doc.restore_to_state(args.index)
            .map_err(|e| ctx.history_error(&e))
    })?;
    render(ctx.output, &receipt, |r, w| {
        pretty_kv(w, "restored", format!("{} ({} cards)", r.restored_from, r.cards))?;
        writeln!(w, "safety snapshot:")?;
        write_receipt(&r.safety, w)?;
        writeln!(w, "restored snapshot:")?;
        write_receipt(&r.after, w)
    })
}
