//! `ct init`: create an empty document.

use anyhow::Result;
use cardtrail_core::Document;
use cardtrail_core::clock::SystemClock;
use cardtrail_core::store::lock::DocumentLock;
use cardtrail_core::store::{lock_path, save_document};
use clap::Args;
use serde::Serialize;
use std::time::Duration;

use super::Context;
use crate::output::{CliError, pretty_kv, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing document, discarding its cards and history.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    file: String,
    overwritten: bool,
}

pub fn run_init(args: &InitArgs, ctx: &Context) -> Result<()> {
    let _lock = DocumentLock::acquire(&lock_path(&ctx.file), Duration::from_secs(5))
        .map_err(|e| ctx.store_error(&e))?;

    let exists = ctx.file.exists();
    if exists && !args.force {
        return Err(ctx.fail(&CliError {
            suggestion: Some("pass --force to start over with an empty history".to_string()),
            ..CliError::new(format!("{} already exists", ctx.file.display()))
        }));
    }

    let doc = Document::new(ctx.config()?, SystemClock);
    save_document(&ctx.file, &doc).map_err(|e| ctx.store_error(&e))?;
    tracing::info!(file = %ctx.file.display(), overwritten = exists, "document initialized");

    let out = InitOutput {
        file: ctx.file.display().to_string(),
        overwritten: exists,
    };
    render(ctx.output, &out, |o, w| pretty_kv(w, "initialized", &o.file))
}
