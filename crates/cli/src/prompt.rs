//! Interactive prompts.
//!
//! All dialoguer interaction lives here: the resolver's decision provider,
//! the target-creation wizard, and the diff-log chooser. The core never
//! touches the terminal itself.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select};

use dirsync_core::diff::log::LogMeta;
use dirsync_core::diff::resolver::DecisionProvider;
use dirsync_core::diff::Diff;
use dirsync_core::target::{self, Target};

use crate::style;

fn to_io(err: dialoguer::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

// ---------------------------------------------------------------------------
// Resolver decisions
// ---------------------------------------------------------------------------

/// Decision provider backed by an interactive confirmation prompt.
///
/// Answering anything but yes skips the diff.
#[derive(Debug, Default)]
pub struct AskUser;

impl DecisionProvider for AskUser {
    fn decide(&mut self, diff: &Diff) -> io::Result<bool> {
        println!();
        println!("{}", style::header("This diff requires your action:"));
        println!("    type:   {}", diff.diff_type);
        println!("    kind:   {}", diff.kind);
        println!("    source: {}", diff.source.display());
        println!("    target: {}", diff.target.display());
        println!();
        println!("Applying will {}.", diff.diff_type.description());

        Confirm::new()
            .with_prompt("Do you want to apply this diff?")
            .default(false)
            .interact()
            .map_err(to_io)
    }
}

// ---------------------------------------------------------------------------
// Diff-log selection
// ---------------------------------------------------------------------------

/// Ask which of a target's diff logs to resolve.
pub fn choose_log<'a>(target_name: &str, logs: &'a [LogMeta]) -> Result<&'a LogMeta> {
    let labels: Vec<&str> = logs.iter().map(|meta| meta.created_at.as_str()).collect();

    let index = Select::new()
        .with_prompt(format!("Choose a diff to resolve for target {target_name}"))
        .items(&labels)
        .default(labels.len() - 1)
        .interact()
        .context("failed to read diff selection")?;

    Ok(&logs[index])
}

// ---------------------------------------------------------------------------
// Target creation wizard
// ---------------------------------------------------------------------------

/// Interactively create a target in `registry_root`.
///
/// `source_root` anchors relative destination paths.
pub fn create_target_wizard(registry_root: &Path, source_root: &Path) -> Result<Target> {
    let name: String = Input::new()
        .with_prompt("Name")
        .interact_text()
        .context("failed to read target name")?;

    let raw_path: String = Input::new()
        .with_prompt("Path")
        .interact_text()
        .context("failed to read target path")?;

    let fast_mode = Confirm::new()
        .with_prompt("Fast mode")
        .default(true)
        .interact()
        .context("failed to read fast mode preference")?;

    let path = absolutize(source_root, Path::new(&raw_path));
    let target = target::create(registry_root, &name, &path, fast_mode)?;

    println!("{}", style::success(&format!("Target {} created", target.name)));
    Ok(target)
}

/// Anchor a possibly relative path at the source root.
fn absolutize(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
