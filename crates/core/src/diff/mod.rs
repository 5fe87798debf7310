//! The diff data model.
//!
//! A [`Diff`] is one detected divergence between a source and a target
//! filesystem element. Diffs are produced by the comparator or parsed from
//! a diff-log line, and are never mutated after creation.
//!
//! On disk a diff is one line of exactly four colon-delimited fields:
//!
//! ```text
//! <type-symbol>:<kind-symbol>:<source-path>:<target-path>
//! ```
//!
//! Colons are not escaped, so paths containing `:` cannot be stored
//! (rejected with [`DiffError::UnsupportedPath`] at write time).

pub mod comparator;
pub mod log;
pub mod resolver;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::DiffError;

// ---------------------------------------------------------------------------
// DiffType
// ---------------------------------------------------------------------------

/// The type of a divergence.
///
/// The declaration order is significant: the ordinal is both the on-disk
/// symbol order and the index into the resolver's 5-element mode tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Source element not present in target.
    Positive,
    /// Target element not present in source.
    Negative,
    /// Source element newer than target element.
    Newer,
    /// Source element older than target element.
    Older,
    /// Present in both with equal modification times; content differs.
    Unknown,
}

impl DiffType {
    /// All types in ordinal order.
    pub const ALL: [DiffType; 5] = [
        Self::Positive,
        Self::Negative,
        Self::Newer,
        Self::Older,
        Self::Unknown,
    ];

    /// Position in the fixed ordinal order.
    pub fn ordinal(self) -> usize {
        match self {
            Self::Positive => 0,
            Self::Negative => 1,
            Self::Newer => 2,
            Self::Older => 3,
            Self::Unknown => 4,
        }
    }

    /// One-character on-disk symbol.
    pub fn symbol(self) -> char {
        match self {
            Self::Positive => '+',
            Self::Negative => '-',
            Self::Newer => '>',
            Self::Older => '<',
            Self::Unknown => '?',
        }
    }

    /// What applying a diff of this type will do, for interactive prompts.
    pub fn description(self) -> &'static str {
        match self {
            Self::Positive => "copy source to target",
            Self::Negative => "copy target to source",
            Self::Newer => "override target with source",
            Self::Older => "override source with target",
            Self::Unknown => "override target with source",
        }
    }

    /// Parse an on-disk symbol.
    pub fn from_symbol(symbol: char) -> Result<Self, DiffError> {
        match symbol {
            '+' => Ok(Self::Positive),
            '-' => Ok(Self::Negative),
            '>' => Ok(Self::Newer),
            '<' => Ok(Self::Older),
            '?' => Ok(Self::Unknown),
            other => Err(DiffError::UnknownTypeSymbol(other)),
        }
    }
}

impl fmt::Display for DiffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Newer => write!(f, "newer"),
            Self::Older => write!(f, "older"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// ElementKind
// ---------------------------------------------------------------------------

/// Whether a diff concerns a directory or a file.
///
/// Resolution treats the two differently: files are copied byte-for-byte,
/// directories are materialized shallowly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Directory,
    File,
}

impl ElementKind {
    /// One-character on-disk symbol.
    pub fn symbol(self) -> char {
        match self {
            Self::Directory => 'd',
            Self::File => 'f',
        }
    }

    /// Parse an on-disk symbol.
    pub fn from_symbol(symbol: char) -> Result<Self, DiffError> {
        match symbol {
            'd' => Ok(Self::Directory),
            'f' => Ok(Self::File),
            other => Err(DiffError::UnknownKindSymbol(other)),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "file"),
        }
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// One detected divergence between a source and a target element.
///
/// Invariant: `source` and `target` denote the same relative position
/// under their respective roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub diff_type: DiffType,
    pub kind: ElementKind,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Diff {
    pub fn new(
        diff_type: DiffType,
        kind: ElementKind,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
    ) -> Self {
        Self {
            diff_type,
            kind,
            source: source.into(),
            target: target.into(),
        }
    }

    /// Format as one diff-log line (without the trailing newline).
    pub fn to_line(&self) -> Result<String, DiffError> {
        let source = storable_path(&self.source)?;
        let target = storable_path(&self.target)?;

        Ok(format!(
            "{}:{}:{}:{}",
            self.diff_type.symbol(),
            self.kind.symbol(),
            source,
            target
        ))
    }

    /// Parse one diff-log line.
    pub fn from_line(line: &str) -> Result<Self, DiffError> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != 4 {
            return Err(DiffError::MalformedLine {
                line: line.to_string(),
                detail: format!("expected 4 fields, found {}", fields.len()),
            });
        }

        let diff_type = DiffType::from_symbol(single_char(fields[0], line)?)?;
        let kind = ElementKind::from_symbol(single_char(fields[1], line)?)?;

        Ok(Self::new(diff_type, kind, fields[2], fields[3]))
    }
}

/// Render a path for the log format, rejecting unrepresentable paths.
fn storable_path(path: &Path) -> Result<&str, DiffError> {
    let as_str = path
        .to_str()
        .ok_or_else(|| DiffError::UnsupportedPath(path.display().to_string()))?;

    if as_str.contains(':') {
        return Err(DiffError::UnsupportedPath(as_str.to_string()));
    }

    Ok(as_str)
}

fn single_char(field: &str, line: &str) -> Result<char, DiffError> {
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(DiffError::MalformedLine {
            line: line.to_string(),
            detail: format!("symbol field '{field}' is not a single character"),
        }),
    }
}
