//! `ct edit`: replace a card's content.

use anyhow::Result;
use clap::Args;

use super::{Context, EditOutcome, resolve_card};

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Card id (a unique prefix is enough).
    pub id: String,

    /// New card text.
    pub content: String,

    /// Also change the category.
    #[arg(long)]
    pub category: Option<String>,

    /// Set or clear (with an empty value) the clone group.
    #[arg(long)]
    pub clone_group: Option<String>,

    /// Mark the card as floating (outside the main flow).
    #[arg(long, overrides_with = "no_floating")]
    pub floating: bool,

    #[arg(long, overrides_with = "floating")]
    pub no_floating: bool,
}

pub fn run_edit(args: &EditArgs, ctx: &Context) -> Result<()> {
    let outcome = ctx.write(|doc| {
        let id = resolve_card(doc, &args.id).map_err(|e| ctx.history_error(&e))?;
        doc.edit_content(&id, args.content.clone())
            .map_err(|e| ctx.history_error(&e))?;
        if let Some(category) = &args.category {
            doc.set_category(&id, category.clone())
                .map_err(|e| ctx.history_error(&e))?;
        }
        if let Some(group) = &args.clone_group {
            let group = (!group.is_empty()).then(|| group.clone());
            doc.set_clone_group(&id, group)
                .map_err(|e| ctx.history_error(&e))?;
        }
        if args.floating || args.no_floating {
            doc.set_floating(&id, args.floating)
                .map_err(|e| ctx.history_error(&e))?;
        }
        Ok(EditOutcome::record(doc, "edited", Some(id)))
    })?;
    outcome.render(ctx.output)
}
