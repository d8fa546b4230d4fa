//! `ct rm`: delete a card and its descendants.

use anyhow::Result;
use clap::Args;

use super::{Context, EditOutcome, resolve_card};

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Card id (a unique prefix is enough).
    pub id: String,
}

pub fn run_rm(args: &RmArgs, ctx: &Context) -> Result<()> {
    let outcome = ctx.write(|doc| {
        let id = resolve_card(doc, &args.id).map_err(|e| ctx.history_error(&e))?;
        let removed = doc.remove_card(&id).map_err(|e| ctx.history_error(&e))?;
        let mut outcome = EditOutcome::record(doc, "removed", Some(id));
        outcome.removed = removed.into_iter().skip(1).collect();
        Ok(outcome)
    })?;
    outcome.render(ctx.output)
}
