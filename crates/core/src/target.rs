//! The target registry.
//!
//! A target maps a human-chosen name to a reconciliation destination. Each
//! target owns a subdirectory of the registry root named after the MD5
//! hash of its name (a fixed-width key with no illegal filesystem
//! characters); inside live its `target.json` metadata and all of its
//! diff logs.

use std::fs;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::TargetError;

/// Name of the per-target metadata file.
pub const METADATA_FILE: &str = "target.json";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A hash value together with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hash {
    pub algo: String,
    pub value: String,
}

impl Hash {
    /// Hash a target name into its registry directory key.
    pub fn of_name(name: &str) -> Self {
        Self {
            algo: "md5".to_string(),
            value: hex::encode(Md5::digest(name.as_bytes())),
        }
    }
}

/// A named reconciliation destination with its own diff-log storage.
///
/// `name` is the only externally stable identifier; `config_dir` is
/// re-derived from the metadata file's location on load rather than
/// trusted from the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Human-friendly unique name.
    pub name: String,

    /// Hash of `name`, used as the on-disk directory key.
    pub hash: Hash,

    /// Absolute path of this target's config directory.
    #[serde(rename = "this")]
    pub config_dir: PathBuf,

    /// Absolute path of the reconciliation destination.
    pub path: PathBuf,

    /// Whether to skip content hashing when modification times agree.
    #[serde(rename = "fast-mode")]
    pub fast_mode: bool,
}

// ---------------------------------------------------------------------------
// Registry operations
// ---------------------------------------------------------------------------

/// Create a new target.
///
/// Fails if a target with the same name (hash key) already exists. The
/// registry root is created on demand.
pub fn create(
    registry_root: &Path,
    name: &str,
    path: &Path,
    fast_mode: bool,
) -> Result<Target, TargetError> {
    let hash = Hash::of_name(name);
    let config_dir = registry_root.join(&hash.value);

    if config_dir.exists() {
        return Err(TargetError::AlreadyExists(name.to_string()));
    }

    let target = Target {
        name: name.to_string(),
        hash,
        config_dir: config_dir.clone(),
        path: path.to_path_buf(),
        fast_mode,
    };

    fs::create_dir_all(&config_dir)?;
    let raw = serde_json::to_string_pretty(&target).map_err(|e| {
        TargetError::MalformedMetadata {
            path: config_dir.join(METADATA_FILE).display().to_string(),
            detail: e.to_string(),
        }
    })?;
    fs::write(config_dir.join(METADATA_FILE), raw)?;

    info!(name, path = %target.path.display(), fast_mode, "created target");
    Ok(target)
}

/// Load every target in the registry, in filesystem listing order.
///
/// Scans subdirectories of `registry_root` for `target.json` files. A
/// missing registry root means no targets yet. A malformed metadata file
/// fails the whole scan: a corrupt registry entry is surfaced, not
/// silently skipped.
pub fn load_all(registry_root: &Path) -> Result<Vec<Target>, TargetError> {
    if !registry_root.exists() {
        return Ok(Vec::new());
    }

    let mut targets = Vec::new();

    for entry in fs::read_dir(registry_root)? {
        let entry = entry?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }

        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.is_file() {
            continue;
        }

        let raw = fs::read_to_string(&metadata_path)?;
        let mut target: Target =
            serde_json::from_str(&raw).map_err(|e| TargetError::MalformedMetadata {
                path: metadata_path.display().to_string(),
                detail: e.to_string(),
            })?;

        // The directory the file was found in wins over the stored value.
        target.config_dir = dir;
        targets.push(target);
    }

    debug!(count = targets.len(), "scanned target registry");
    Ok(targets)
}

/// Load a target by name; first match wins.
pub fn load(registry_root: &Path, name: &str) -> Result<Target, TargetError> {
    load_all(registry_root)?
        .into_iter()
        .find(|target| target.name == name)
        .ok_or_else(|| TargetError::NotFound(name.to_string()))
}

/// Delete a target and all of its diff logs. Irreversible.
pub fn delete(registry_root: &Path, name: &str) -> Result<(), TargetError> {
    let target = load(registry_root, name)?;
    fs::remove_dir_all(&target.config_dir)?;

    info!(name, "deleted target");
    Ok(())
}
