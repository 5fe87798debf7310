//! dirsync command-line tool.
//!
//! Provides subcommands for initializing a source directory, creating and
//! resolving diff logs against named targets, managing the target
//! registry, and migrating legacy control directories.
//!
//! Exit codes are stable for scripting: each core error kind maps to a
//! fixed numeric code (see `dirsync_core::errors`); anything else exits 1.

mod prompt;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing_subscriber::EnvFilter;

use dirsync_core::diff::comparator::compare;
use dirsync_core::diff::log::{list_logs, DiffLogReader, DiffLogWriter};
use dirsync_core::diff::resolver::{resolve, Modes};
use dirsync_core::errors::{CoreError, DiffError, ResolveError, TargetError, WorkspaceError};
use dirsync_core::ignore::IgnoreMatcher;
use dirsync_core::legacy::{self, MigrationOutcome};
use dirsync_core::target;
use dirsync_core::workspace::Workspace;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// dirsync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "dirsync",
    version,
    about = "Detect and reconcile divergence between two directory trees"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize the current directory as a dirsync source.
    Init,

    /// Create, resolve, and list diff logs.
    Diff {
        #[command(subcommand)]
        action: DiffAction,
    },

    /// Manage reconciliation targets.
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },

    /// Work with legacy control-directory layouts.
    Legacy {
        #[command(subcommand)]
        action: LegacyAction,
    },
}

#[derive(Subcommand, Debug)]
enum DiffAction {
    /// Compare the source against a target and record the divergences.
    Create {
        /// Name of the target to compare against.
        target: String,
    },
    /// Replay a recorded diff log and reconcile the filesystem.
    Resolve {
        /// Name of the target whose log to resolve.
        target: String,

        /// Five mode digits, one per diff type in the order + - > < ?
        /// (0 = skip, 1 = apply, 2 = ask).
        #[arg(long)]
        modes: String,
    },
    /// List all recorded diff logs for a target.
    List {
        /// Name of the target.
        target: String,
    },
}

#[derive(Subcommand, Debug)]
enum TargetAction {
    /// Create a target interactively.
    Create,
    /// List all targets.
    List,
    /// Delete a target and all of its diff logs.
    Delete {
        /// Name of the target to delete.
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum LegacyAction {
    /// Migrate a legacy control directory to the current layout.
    Migrate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{e:#}")));
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = std::env::current_dir().context("failed to determine the current directory")?;

    match cli.command {
        Commands::Init => cmd_init(&root),
        Commands::Diff { action } => match action {
            DiffAction::Create { target } => cmd_diff_create(&root, &target),
            DiffAction::Resolve { target, modes } => cmd_diff_resolve(&root, &target, &modes),
            DiffAction::List { target } => cmd_diff_list(&root, &target),
        },
        Commands::Target { action } => match action {
            TargetAction::Create => cmd_target_create(&root),
            TargetAction::List => cmd_target_list(&root),
            TargetAction::Delete { name } => cmd_target_delete(&root, &name),
        },
        Commands::Legacy { action } => match action {
            LegacyAction::Migrate => cmd_legacy_migrate(&root),
        },
    }
}

/// Map an error chain to the stable exit code of its core cause.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<CoreError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<WorkspaceError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<TargetError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<DiffError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<ResolveError>() {
            return e.exit_code();
        }
    }
    1
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(root: &PathBuf) -> Result<()> {
    Workspace::initialize(root)?;
    println!("{}", style::success("Initialized empty dirsync source."));
    Ok(())
}

fn cmd_diff_create(root: &PathBuf, name: &str) -> Result<()> {
    let ws = Workspace::open(root)?;
    let config = ws.load_config()?;
    let matcher = IgnoreMatcher::new(&config.ignore)?;
    let tgt = target::load(ws.target_dir(), name)?;

    let mut writer = DiffLogWriter::create(&tgt.config_dir)?;
    let emitted = compare(&mut writer, ws.root(), &tgt.path, tgt.fast_mode, &matcher)?;
    let log_path = writer.finish()?;

    println!(
        "{}",
        style::success(&format!(
            "{} diff(s) recorded in {}",
            emitted,
            log_path.display()
        ))
    );
    Ok(())
}

fn cmd_diff_resolve(root: &PathBuf, name: &str, modes: &str) -> Result<()> {
    let ws = Workspace::open(root)?;
    let tgt = target::load(ws.target_dir(), name)?;
    let modes = Modes::parse(modes)?;

    let logs = list_logs(&tgt.config_dir)?;
    if logs.is_empty() {
        println!("No diff logs found for target {}.", tgt.name);
        return Ok(());
    }

    let meta = prompt::choose_log(&tgt.name, &logs)?;
    let reader = DiffLogReader::open(&meta.path)?;

    let outcome = resolve(reader, &modes, &mut prompt::AskUser)?;
    println!(
        "{}",
        style::success(&format!(
            "Resolved: {} applied, {} skipped, {} missing",
            outcome.applied, outcome.skipped, outcome.missing
        ))
    );
    Ok(())
}

fn cmd_diff_list(root: &PathBuf, name: &str) -> Result<()> {
    let ws = Workspace::open(root)?;
    let tgt = target::load(ws.target_dir(), name)?;

    let logs = list_logs(&tgt.config_dir)?;
    if logs.is_empty() {
        println!("No diffs found for target {}.", tgt.name);
        return Ok(());
    }

    println!("{}", style::header(&format!("Diffs for target {}:", tgt.name)));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Created"]);

    for (index, meta) in logs.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&meta.created_at),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn cmd_target_create(root: &PathBuf) -> Result<()> {
    let ws = Workspace::open(root)?;
    println!("Creating a new target for source {}", ws.root().display());

    prompt::create_target_wizard(ws.target_dir(), ws.root())?;
    Ok(())
}

fn cmd_target_list(root: &PathBuf) -> Result<()> {
    let ws = Workspace::open(root)?;
    let targets = target::load_all(ws.target_dir())?;

    if targets.is_empty() {
        println!("No targets found.");
        return Ok(());
    }

    println!(
        "{}",
        style::header(&format!("Targets for source {}:", ws.root().display()))
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Path", "Fast mode"]);

    for tgt in &targets {
        table.add_row(vec![
            Cell::new(&tgt.name),
            Cell::new(tgt.path.display()),
            Cell::new(if tgt.fast_mode { "on" } else { "off" }),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn cmd_target_delete(root: &PathBuf, name: &str) -> Result<()> {
    let ws = Workspace::open(root)?;
    target::delete(ws.target_dir(), name)?;

    println!("{}", style::success(&format!("Deleted target {name}")));
    Ok(())
}

fn cmd_legacy_migrate(root: &PathBuf) -> Result<()> {
    match legacy::migrate(root)? {
        MigrationOutcome::Migrated => {
            println!("{}", style::success("Migration complete"));
        }
        MigrationOutcome::AlreadyCurrent => {
            println!("Directory {} is already using the current layout.", root.display());
        }
        MigrationOutcome::NotControlled => {
            println!(
                "{}",
                style::warn(&format!(
                    "Directory {} is not under control of dirsync or not able to migrate",
                    root.display()
                ))
            );
        }
    }
    Ok(())
}
