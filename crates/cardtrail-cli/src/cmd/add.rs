//! `ct add`: create a card.

use anyhow::Result;
use clap::Args;

use super::{Context, EditOutcome, resolve_card};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Card text.
    pub content: String,

    /// Parent card id; the card becomes a root when omitted.
    #[arg(long)]
    pub parent: Option<String>,

    /// Free-form category label, e.g. "scene".
    #[arg(long, default_value = "")]
    pub category: String,

    /// Sibling position. Defaults to after the last sibling.
    #[arg(long)]
    pub order: Option<i64>,
}

pub fn run_add(args: &AddArgs, ctx: &Context) -> Result<()> {
    let outcome = ctx.write(|doc| {
        let parent = args
            .parent
            .as_deref()
            .map(|raw| resolve_card(doc, raw))
            .transpose()
            .map_err(|e| ctx.history_error(&e))?;
        let id = doc
            .add_card(args.content.clone(), parent, args.category.clone(), args.order)
            .map_err(|e| ctx.history_error(&e))?;
        Ok(EditOutcome::record(doc, "added", Some(id)))
    })?;
    outcome.render(ctx.output)
}
