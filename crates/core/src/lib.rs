//! dirsync core library.
//!
//! This crate provides the foundational components for directory divergence
//! detection and reconciliation: the workspace control directory, ignore
//! patterns, the tree comparator, the diff-log format, the resolver, the
//! target registry, and legacy-layout migration.

pub mod diff;
pub mod errors;
pub mod ignore;
pub mod legacy;
pub mod target;
pub mod workspace;

// Re-exports for convenience.
pub use diff::{Diff, DiffType, ElementKind};
pub use errors::CoreError;
pub use ignore::IgnoreMatcher;
pub use target::Target;
pub use workspace::Workspace;
