//! `ct archive`: hide a card without deleting it.

use anyhow::Result;
use clap::Args;

use super::{Context, EditOutcome, resolve_card};

#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Card id (a unique prefix is enough).
    pub id: String,

    /// Unarchive instead.
    #[arg(long)]
    pub undo: bool,
}

pub fn run_archive(args: &ArchiveArgs, ctx: &Context) -> Result<()> {
    let outcome = ctx.write(|doc| {
        let id = resolve_card(doc, &args.id).map_err(|e| ctx.history_error(&e))?;
        doc.set_archived(&id, !args.undo)
            .map_err(|e| ctx.history_error(&e))?;
        let action = if args.undo { "unarchived" } else { "archived" };
        Ok(EditOutcome::record(doc, action, Some(id)))
    })?;
    outcome.render(ctx.output)
}
