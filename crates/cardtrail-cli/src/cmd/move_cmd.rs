//! `ct move`: re-parent or re-order a card.

use anyhow::Result;
use clap::Args;

use super::{Context, EditOutcome, resolve_card};

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Card id (a unique prefix is enough).
    pub id: String,

    /// New parent card id. Without it the card becomes a root.
    #[arg(long)]
    pub parent: Option<String>,

    /// Sibling position. Defaults to after the last sibling.
    #[arg(long)]
    pub order: Option<i64>,
}

pub fn run_move(args: &MoveArgs, ctx: &Context) -> Result<()> {
    let outcome = ctx.write(|doc| {
        let id = resolve_card(doc, &args.id).map_err(|e| ctx.history_error(&e))?;
        let parent = args
            .parent
            .as_deref()
            .map(|raw| resolve_card(doc, raw))
            .transpose()
            .map_err(|e| ctx.history_error(&e))?;
        doc.move_card(&id, parent, args.order)
            .map_err(|e| ctx.history_error(&e))?;
        Ok(EditOutcome::record(doc, "moved", Some(id)))
    })?;
    outcome.render(ctx.output)
}
