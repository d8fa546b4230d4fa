//! `ct diff`: what changed between two history points.

use anyhow::Result;
use cardtrail_core::history::diff::{FieldChange, StateDiff};
use clap::Args;
use std::io::Write;

use super::Context;
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Earlier history index.
    pub from: usize,
    /// Later history index.
    pub to: usize,
}

pub fn run_diff(args: &DiffArgs, ctx: &Context) -> Result<()> {
    let diff = ctx.read(|doc| {
        doc.diff(args.from, args.to)
            .map_err(|e| ctx.history_error(&e))
    })?;
    render_mode(ctx.output, &diff, |d, w| render_diff_text(d, w), |d, w| {
        pretty_section(w, &format!("Changes {} → {}", args.from, args.to))?;
        if d.is_empty() {
            writeln!(w, "no differences")?;
        }
        render_diff_text(d, w)
    })
}

fn field_name(field: FieldChange) -> &'static str {
    match field {
        FieldChange::Content => "content",
        FieldChange::Parent => "parent",
        FieldChange::Order => "order",
        FieldChange::Category => "category",
        FieldChange::Floating => "floating",
        FieldChange::Archived => "archived",
        FieldChange::CloneGroup => "clone_group",
    }
}

fn render_diff_text(diff: &StateDiff, w: &mut dyn Write) -> std::io::Result<()> {
    for card in &diff.added {
        writeln!(w, "+ {}  {}", card.id, card.content)?;
    }
    for card in &diff.removed {
        writeln!(w, "- {}  {}", card.id, card.content)?;
    }
    for change in &diff.changed {
        let fields: Vec<&str> = change.fields.iter().copied().map(field_name).collect();
        writeln!(w, "~ {}  {}", change.id, fields.join(","))?;
    }
    Ok(())
}
