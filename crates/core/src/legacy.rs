//! Migration from the legacy (v1) control-directory layout.
//!
//! A v1 source keeps a bare `destination` file (and optionally a
//! `fast_mode` file containing `on` or `off`) directly inside the control
//! directory, with diff logs as loose siblings. v2 introduces
//! `dirsync.json` and the per-target registry under `target.d/`; migration
//! folds the single v1 destination into a target named `default` and moves
//! the loose logs into its config directory.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::diff::log::LOG_EXTENSION;
use crate::errors::CoreError;
use crate::target;
use crate::workspace::{self, WorkspaceConfig, CONFIG_FILE, CONTROL_DIR, TARGET_DIR};

/// What a migration run found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// A v1 layout was upgraded to v2.
    Migrated,
    /// The directory already uses the v2 layout; nothing to do.
    AlreadyCurrent,
    /// The directory is not under dirsync control at all.
    NotControlled,
}

/// Detect the layout version under `root` and upgrade to v2 if needed.
pub fn migrate(root: &Path) -> Result<MigrationOutcome, CoreError> {
    let control_dir = root.join(CONTROL_DIR);
    let target_dir = control_dir.join(TARGET_DIR);

    if target_dir.exists() {
        info!(root = %root.display(), "already under control in the current layout");
        return Ok(MigrationOutcome::AlreadyCurrent);
    }

    if !control_dir.exists() {
        info!(root = %root.display(), "not under dirsync control, nothing to migrate");
        return Ok(MigrationOutcome::NotControlled);
    }

    info!(root = %root.display(), "legacy layout detected, migrating");
    v1_to_v2(&control_dir, &target_dir)?;
    Ok(MigrationOutcome::Migrated)
}

fn v1_to_v2(control_dir: &Path, target_dir: &Path) -> Result<(), CoreError> {
    // The v1 layout predates dirsync.json; write one for the new layout.
    let config = WorkspaceConfig {
        api_version: workspace::API_VERSION.to_string(),
        ignore: vec![CONTROL_DIR.into(), ".DS_Store".into()],
    };
    let raw = serde_json::to_string_pretty(&config).map_err(|e| {
        crate::errors::WorkspaceError::MalformedConfig {
            path: control_dir.join(CONFIG_FILE).display().to_string(),
            detail: e.to_string(),
        }
    })?;
    fs::write(control_dir.join(CONFIG_FILE), raw)?;

    let destination_file = control_dir.join("destination");
    if !destination_file.exists() {
        info!("no destination was set, so no target is created");
        return Ok(());
    }

    let destination = fs::read_to_string(&destination_file)?.trim().to_string();
    info!(destination, "legacy destination becomes the 'default' target");

    let fast_mode_file = control_dir.join("fast_mode");
    let fast_mode = if fast_mode_file.exists() {
        let flag = fs::read_to_string(&fast_mode_file)?;
        fs::remove_file(&fast_mode_file)?;
        flag.trim() == "on"
    } else {
        info!("fast mode not defined, inferring off");
        false
    };

    let target = target::create(target_dir, "default", Path::new(&destination), fast_mode)?;

    // Loose v1 diff logs belong to the one migrated target.
    for entry in fs::read_dir(control_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == LOG_EXTENSION);
        if is_log {
            let moved = target.config_dir.join(entry.file_name());
            fs::rename(&path, &moved)?;
            info!(log = %moved.display(), "moved legacy diff log");
        }
    }

    fs::remove_file(&destination_file)?;
    info!(name = %target.name, "migration complete");
    Ok(())
}
