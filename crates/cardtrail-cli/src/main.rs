#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::Context;
use output::{OutputMode, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ct: snapshot history for card documents",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Document file to operate on.
    #[arg(long, global = true, env = "CARDTRAIL_FILE", default_value = "cardtrail.json")]
    file: PathBuf,

    /// Output format. Defaults to pretty on a terminal and text when piped.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Document",
        about = "Create an empty document",
        after_help = "EXAMPLES:\n    ct init\n    ct --file novel.json init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Cards",
        about = "Add a card",
        after_help = "EXAMPLES:\n    ct add \"Act I\" --category act\n    ct add \"Opening scene\" --parent c-1a2b --category scene"
    )]
    Add(cmd::add::AddArgs),

    #[command(next_help_heading = "Cards", about = "Replace a card's content")]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Cards",
        about = "Re-parent or re-order a card",
        after_help = "EXAMPLES:\n    ct move c-1a2b --parent c-9f8e --order 0\n    ct move c-1a2b    # make it a root card"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(next_help_heading = "Cards", about = "Archive or unarchive a card")]
    Archive(cmd::archive::ArchiveArgs),

    #[command(next_help_heading = "Cards", about = "Delete a card and its descendants")]
    Rm(cmd::rm::RmArgs),

    #[command(
        next_help_heading = "History",
        about = "Record a snapshot of the current cards",
        after_help = "EXAMPLES:\n    ct snapshot\n    ct snapshot --name \"Draft 1\""
    )]
    Snapshot(cmd::snapshot::SnapshotArgs),

    #[command(next_help_heading = "History", about = "List history entries")]
    Log(cmd::log::LogArgs),

    #[command(next_help_heading = "History", about = "Show the cards at a history point")]
    Show(cmd::show::ShowArgs),

    #[command(next_help_heading = "History", about = "Compare two history points")]
    Diff(cmd::diff::DiffArgs),

    #[command(
        next_help_heading = "History",
        about = "Restore the cards from a history point",
        long_about = "Restore the cards from a history point. The current cards are saved \
                      first as a named snapshot, so a restore can itself be undone."
    )]
    Restore(cmd::restore::RestoreArgs),

    #[command(next_help_heading = "Maintenance", about = "Compact old history")]
    Compact(cmd::compact::CompactArgs),

    #[command(next_help_heading = "Maintenance", about = "Check history integrity")]
    Verify(cmd::verify::VerifyArgs),

    #[command(next_help_heading = "Maintenance", about = "Generate shell completions")]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CARDTRAIL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "cardtrail=debug,ct=debug,info"
        } else {
            "cardtrail=info,ct=info,warn"
        })
    });

    let format = env::var("CARDTRAIL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context {
        file: cli.file.clone(),
        output: resolve_output_mode(cli.format, cli.json),
    };
    debug!(file = %ctx.file.display(), output = ?ctx.output, "starting command");

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, &ctx),
        Commands::Add(ref args) => cmd::add::run_add(args, &ctx),
        Commands::Edit(ref args) => cmd::edit::run_edit(args, &ctx),
        Commands::Move(ref args) => cmd::move_cmd::run_move(args, &ctx),
        Commands::Archive(ref args) => cmd::archive::run_archive(args, &ctx),
        Commands::Rm(ref args) => cmd::rm::run_rm(args, &ctx),
        Commands::Snapshot(ref args) => cmd::snapshot::run_snapshot(args, &ctx),
        Commands::Log(ref args) => cmd::log::run_log(args, &ctx),
        Commands::Show(ref args) => cmd::show::run_show(args, &ctx),
        Commands::Diff(ref args) => cmd::diff::run_diff(args, &ctx),
        Commands::Restore(ref args) => cmd::restore::run_restore(args, &ctx),
        Commands::Compact(ref args) => cmd::compact::run_compact(args, &ctx),
        Commands::Verify(ref args) => cmd::verify::run_verify(args, &ctx),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
