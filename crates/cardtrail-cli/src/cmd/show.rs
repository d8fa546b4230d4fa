//! `ct show`: the resolved card tree at one history point.

use anyhow::Result;
use cardtrail_core::model::{CardId, CardSnapshot};
use clap::Args;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

use super::Context;
use crate::output::{local_time, pretty_kv, pretty_rule, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// History index as listed by `ct log`.
    pub index: usize,

    /// Include archived cards.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct ShowCard {
    pub depth: usize,
    #[serde(flatten)]
    pub card: CardSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ShowState {
    pub index: usize,
    pub id: String,
    pub timestamp_us: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub cards: Vec<ShowCard>,
}

/// Attach tree depth to cards already in parent-before-child order.
fn with_depth(cards: Vec<CardSnapshot>) -> Vec<ShowCard> {
    let mut depths: HashMap<CardId, usize> = HashMap::with_capacity(cards.len());
    cards
        .into_iter()
        .map(|card| {
            let depth = card
                .parent
                .as_ref()
                .and_then(|p| depths.get(p))
                .map_or(0, |d| d + 1);
            depths.insert(card.id.clone(), depth);
            ShowCard { depth, card }
        })
        .collect()
}

pub fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    let state = ctx.read(|doc| {
        let cards = doc
            .resolve_state_checked(args.index)
            .map_err(|e| ctx.history_error(&e))?;
        let entry = doc
            .history()
            .get(args.index)
            .ok_or_else(|| anyhow::anyhow!("history entry {} vanished", args.index))?;
        Ok(ShowState {
            index: args.index,
            id: entry.id.to_string(),
            timestamp_us: entry.timestamp_us,
            name: entry.name.clone(),
            cards: with_depth(cards)
                .into_iter()
                .filter(|c| args.all || !c.card.archived)
                .collect(),
        })
    })?;

    render_mode(ctx.output, &state, |s, w| render_show_text(s, w), |s, w| render_show_human(s, w))
}

fn render_show_text(state: &ShowState, w: &mut dyn Write) -> std::io::Result<()> {
    for c in &state.cards {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            c.card.id,
            c.card.parent.as_ref().map_or("-", CardId::as_str),
            c.card.order,
            c.card.content.replace('\n', " ")
        )?;
    }
    Ok(())
}

fn render_show_human(state: &ShowState, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(w, "entry", format!("{} ({})", state.index, state.id))?;
    pretty_kv(w, "time", local_time(state.timestamp_us))?;
    if let Some(name) = &state.name {
        pretty_kv(w, "name", name)?;
    }
    pretty_rule(w)?;
    for c in &state.cards {
        let mut flags = String::new();
        if !c.card.category.is_empty() {
            flags.push_str(&format!(" [{}]", c.card.category));
        }
        if c.card.archived {
            flags.push_str(" (archived)");
        }
        if c.card.floating {
            flags.push_str(" (floating)");
        }
        writeln!(
            w,
            "{:indent$}{}  {}{flags}",
            "",
            c.card.id,
            c.card.content.lines().next().unwrap_or(""),
            indent = c.depth * 2
        )?;
    }
    Ok(())
}
