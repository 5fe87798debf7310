//! The workspace control directory.
//!
//! A directory becomes a dirsync *source* by initializing a `.dirsync`
//! control directory at its root. The control directory holds the workspace
//! configuration file (`dirsync.json`) and the target registry root
//! (`target.d/`), where each target keeps its metadata and diff logs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::WorkspaceError;

/// Name of the control directory inside a source root.
pub const CONTROL_DIR: &str = ".dirsync";

/// Name of the workspace configuration file inside the control directory.
pub const CONFIG_FILE: &str = "dirsync.json";

/// Name of the target registry directory inside the control directory.
pub const TARGET_DIR: &str = "target.d";

/// On-disk format version written by this release.
pub const API_VERSION: &str = "v2";

// ---------------------------------------------------------------------------
// Configuration file
// ---------------------------------------------------------------------------

/// Contents of `dirsync.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Version tag indicating which layout the control directory uses.
    #[serde(rename = "api-version")]
    pub api_version: String,

    /// Glob-lite patterns for path segments excluded from comparison.
    pub ignore: Vec<String>,
}

impl WorkspaceConfig {
    /// The configuration written by `initialize`.
    pub fn initial() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            ignore: vec![CONTROL_DIR.into(), "venv".into(), ".DS_Store".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// Handle to an initialized source directory.
///
/// All paths are absolute; the core never consults the process working
/// directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    control_dir: PathBuf,
    target_dir: PathBuf,
}

impl Workspace {
    /// Initialize `root` as a dirsync source.
    ///
    /// Creates the control directory and writes the initial configuration.
    /// Fails if the control directory already exists.
    pub fn initialize(root: &Path) -> Result<Self, WorkspaceError> {
        let control_dir = root.join(CONTROL_DIR);
        if control_dir.exists() {
            return Err(WorkspaceError::AlreadyUnderControl(
                root.display().to_string(),
            ));
        }

        fs::create_dir_all(&control_dir)?;

        let config = WorkspaceConfig::initial();
        let raw = serde_json::to_string_pretty(&config).map_err(|e| {
            WorkspaceError::MalformedConfig {
                path: control_dir.join(CONFIG_FILE).display().to_string(),
                detail: e.to_string(),
            }
        })?;
        fs::write(control_dir.join(CONFIG_FILE), raw)?;

        info!(root = %root.display(), "initialized empty dirsync source");
        Ok(Self::assemble(root, control_dir))
    }

    /// Open an already initialized source directory.
    ///
    /// Fails if `root` is not under dirsync control.
    pub fn open(root: &Path) -> Result<Self, WorkspaceError> {
        let control_dir = root.join(CONTROL_DIR);
        if !control_dir.exists() {
            return Err(WorkspaceError::NotUnderControl(root.display().to_string()));
        }

        debug!(root = %root.display(), "opened dirsync workspace");
        Ok(Self::assemble(root, control_dir))
    }

    fn assemble(root: &Path, control_dir: PathBuf) -> Self {
        let target_dir = control_dir.join(TARGET_DIR);
        Self {
            root: root.to_path_buf(),
            control_dir,
            target_dir,
        }
    }

    /// The source root this workspace controls.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.dirsync` control directory.
    pub fn control_dir(&self) -> &Path {
        &self.control_dir
    }

    /// The target registry root (`.dirsync/target.d`).
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Parse `dirsync.json`.
    pub fn load_config(&self) -> Result<WorkspaceConfig, WorkspaceError> {
        let path = self.control_dir.join(CONFIG_FILE);
        let raw = fs::read_to_string(&path)?;

        serde_json::from_str(&raw).map_err(|e| WorkspaceError::MalformedConfig {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }
}
