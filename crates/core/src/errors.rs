//! Error types for the dirsync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all. Every variant maps to a
//! stable numeric code via [`CoreError::exit_code`] so scripts can branch
//! on the process exit status.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Stable numeric code for scripting.
    ///
    /// The codes form the process-exit contract of the CLI: they never
    /// change meaning between releases.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Workspace(e) => e.exit_code(),
            Self::Target(e) => e.exit_code(),
            Self::Diff(e) => e.exit_code(),
            Self::Resolve(e) => e.exit_code(),
            Self::Io(_) => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Workspace errors
// ---------------------------------------------------------------------------

/// Errors from the workspace control directory.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// A command required the directory to be under dirsync control.
    #[error("'{0}' is not under control of dirsync (run `dirsync init` first)")]
    NotUnderControl(String),

    /// Re-initialization of an already controlled directory.
    #[error("'{0}' is already under control of dirsync")]
    AlreadyUnderControl(String),

    /// The workspace configuration file is structurally invalid.
    #[error("malformed workspace configuration at '{path}': {detail}")]
    MalformedConfig { path: String, detail: String },

    /// Generic I/O wrapper.
    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkspaceError {
    /// Stable numeric code for scripting.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotUnderControl(_) => 2,
            Self::AlreadyUnderControl(_) => 3,
            Self::MalformedConfig { .. } => 30,
            Self::Io(_) => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Target registry errors
// ---------------------------------------------------------------------------

/// Errors from the target registry.
#[derive(Debug, Error)]
pub enum TargetError {
    /// No target with the given name exists in the registry.
    #[error("target '{0}' does not exist")]
    NotFound(String),

    /// A target with the given name already exists.
    #[error("target '{0}' already exists")]
    AlreadyExists(String),

    /// A `target.json` file is missing required keys or is not valid JSON.
    #[error("malformed target metadata at '{path}': {detail}")]
    MalformedMetadata { path: String, detail: String },

    /// Generic I/O wrapper.
    #[error("target I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TargetError {
    /// Stable numeric code for scripting.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound(_) => 10,
            Self::AlreadyExists(_) => 11,
            Self::MalformedMetadata { .. } => 12,
            Self::Io(_) => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Diff model / log errors
// ---------------------------------------------------------------------------

/// Errors from the diff data model and the diff-log reader/writer.
#[derive(Debug, Error)]
pub enum DiffError {
    /// A log line did not have exactly four colon-delimited fields.
    #[error(
        "malformed diff line '{line}': {detail} \
         (format is <type>:<kind>:<source>:<target>)"
    )]
    MalformedLine { line: String, detail: String },

    /// An unrecognized diff-type symbol.
    #[error("unknown diff type symbol '{0}'")]
    UnknownTypeSymbol(char),

    /// An unrecognized element-kind symbol.
    #[error("unknown element kind symbol '{0}'")]
    UnknownKindSymbol(char),

    /// A path cannot be represented in the log format.
    #[error("path '{0}' cannot be stored in a diff log (contains ':' or is not UTF-8)")]
    UnsupportedPath(String),

    /// Generic I/O wrapper.
    #[error("diff log I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiffError {
    /// Stable numeric code for scripting.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MalformedLine { .. } => 21,
            Self::UnknownTypeSymbol(_) => 21,
            Self::UnknownKindSymbol(_) => 21,
            Self::UnsupportedPath(_) => 22,
            Self::Io(_) => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver errors
// ---------------------------------------------------------------------------

/// Errors from diff resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The mode tuple has the wrong arity or an out-of-range value.
    #[error(
        "invalid modes '{modes}': {detail} \
         (there must be exactly five modes, each one of 0=skip, 1=apply, 2=ask)"
    )]
    InvalidModes { modes: String, detail: String },

    /// The underlying log could not be read.
    #[error(transparent)]
    Log(#[from] DiffError),

    /// Generic I/O wrapper.
    #[error("resolve I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    /// Stable numeric code for scripting.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidModes { .. } => 20,
            Self::Log(e) => e.exit_code(),
            Self::Io(_) => 1,
        }
    }
}
