//! `ct snapshot`: record the current cards as a history point.

use anyhow::Result;
use cardtrail_core::SnapshotReceipt;
use clap::Args;

use super::{Context, resolve_card, write_receipt};
use crate::output::render;

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Name the snapshot. Named snapshots are always full and never compacted away.
    #[arg(long)]
    pub name: Option<String>,

    /// Encode the complete state even if nothing changed.
    #[arg(long)]
    pub full: bool,

    /// Card id to attach as a note.
    #[arg(long)]
    pub note: Option<String>,
}

pub fn run_snapshot(args: &SnapshotArgs, ctx: &Context) -> Result<()> {
    let receipt: SnapshotReceipt = ctx.write(|doc| {
        let note = args
            .note
            .as_deref()
            .map(|raw| resolve_card(doc, raw))
            .transpose()
            .map_err(|e| ctx.history_error(&e))?;
        let name = args.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        Ok(doc.take_snapshot(args.full, name, note))
    })?;
    render(ctx.output, &receipt, |r, w| write_receipt(r, w))
}
