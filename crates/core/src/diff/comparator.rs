//! The recursive tree comparator.
//!
//! Walks a source tree and its target counterpart in lock-step and writes
//! a [`Diff`] for every detected divergence through a [`DiffLogWriter`].
//! The walk is one-directional: elements present only under the target
//! root are not visited, so `negative` diffs never originate here.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use md5::{Digest, Md5};
use tracing::info;

use crate::diff::log::DiffLogWriter;
use crate::diff::{Diff, DiffType, ElementKind};
use crate::errors::DiffError;
use crate::ignore::IgnoreMatcher;

/// Compare two directory trees, appending one diff per divergence.
///
/// For each non-ignored entry under `source_root`: a directory missing
/// under `target_root` yields `(+, d)` and is not descended into; a
/// present directory is recursed into; a missing file yields `(+, f)`; a
/// present file is compared by modification time and, when the times are
/// practically equal and `fast_mode` is off, by content hash.
///
/// Returns the number of diffs written.
pub fn compare(
    writer: &mut DiffLogWriter,
    source_root: &Path,
    target_root: &Path,
    fast_mode: bool,
    matcher: &IgnoreMatcher,
) -> Result<u64, DiffError> {
    let mut emitted = 0;
    compare_dir(writer, source_root, target_root, fast_mode, matcher, &mut emitted)?;
    Ok(emitted)
}

fn compare_dir(
    writer: &mut DiffLogWriter,
    source: &Path,
    target: &Path,
    fast_mode: bool,
    matcher: &IgnoreMatcher,
    emitted: &mut u64,
) -> Result<(), DiffError> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        if matcher.is_ignored(&name.to_string_lossy()) {
            continue;
        }

        let source_element = entry.path();
        let target_element = target.join(&name);

        if source_element.is_dir() {
            compare_directory_entry(
                writer,
                &source_element,
                &target_element,
                fast_mode,
                matcher,
                emitted,
            )?;
        } else {
            compare_file_entry(writer, &source_element, &target_element, fast_mode, emitted)?;
        }
    }

    Ok(())
}

fn compare_directory_entry(
    writer: &mut DiffLogWriter,
    source: &Path,
    target: &Path,
    fast_mode: bool,
    matcher: &IgnoreMatcher,
    emitted: &mut u64,
) -> Result<(), DiffError> {
    if !target.exists() {
        info!(source = %source.display(), "directory not in target");
        emit(
            writer,
            Diff::new(DiffType::Positive, ElementKind::Directory, source, target),
            emitted,
        )
    } else {
        compare_dir(writer, source, target, fast_mode, matcher, emitted)
    }
}

fn compare_file_entry(
    writer: &mut DiffLogWriter,
    source: &Path,
    target: &Path,
    fast_mode: bool,
    emitted: &mut u64,
) -> Result<(), DiffError> {
    if !target.exists() {
        info!(source = %source.display(), "file not in target");
        return emit(
            writer,
            Diff::new(DiffType::Positive, ElementKind::File, source, target),
            emitted,
        );
    }

    let source_mtime = mtime_seconds(source)?;
    let target_mtime = mtime_seconds(target)?;

    if !timestamps_practically_equal(source_mtime, target_mtime) {
        if source_mtime > target_mtime {
            info!(
                source = %source.display(),
                target = %target.display(),
                "files differ: source is newer"
            );
            return emit(
                writer,
                Diff::new(DiffType::Newer, ElementKind::File, source, target),
                emitted,
            );
        }

        info!(
            source = %source.display(),
            target = %target.display(),
            "files differ: target is newer"
        );
        return emit(
            writer,
            Diff::new(DiffType::Older, ElementKind::File, source, target),
            emitted,
        );
    }

    // Equal timestamps: in fast mode the content is assumed unchanged.
    if !fast_mode && file_digest(source)? != file_digest(target)? {
        info!(source = %source.display(), "files differ: content mismatch at equal mtime");
        return emit(
            writer,
            Diff::new(DiffType::Unknown, ElementKind::File, source, target),
            emitted,
        );
    }

    Ok(())
}

fn emit(writer: &mut DiffLogWriter, diff: Diff, emitted: &mut u64) -> Result<(), DiffError> {
    writer.append(&diff)?;
    *emitted += 1;
    Ok(())
}

// ---------------------------------------------------------------------------
// File comparison primitives
// ---------------------------------------------------------------------------

fn mtime_seconds(path: &Path) -> Result<f64, DiffError> {
    let modified = fs::metadata(path)?.modified()?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Ok(since_epoch.as_secs_f64())
}

fn file_digest(path: &Path) -> Result<[u8; 16], DiffError> {
    let bytes = fs::read(path)?;
    Ok(Md5::digest(&bytes).into())
}

/// Timestamp equality across filesystems with different sub-second
/// resolutions.
///
/// The higher-precision value is truncated (not rounded) to the other's
/// decimal-digit count before comparing; at equal precision the raw values
/// are compared directly.
fn timestamps_practically_equal(a: f64, b: f64) -> bool {
    let a_digits = fraction_digits(a);
    let b_digits = fraction_digits(b);

    if a_digits == b_digits {
        a == b
    } else if a_digits < b_digits {
        a == truncate_fraction(b, a_digits)
    } else {
        truncate_fraction(a, b_digits) == b
    }
}

fn fraction_digits(value: f64) -> usize {
    let repr = format!("{value}");
    repr.split_once('.').map_or(0, |(_, frac)| frac.len())
}

/// Truncate `value` to `digits` decimal places without rounding.
fn truncate_fraction(value: f64, digits: usize) -> f64 {
    let repr = format!("{value}");
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    if digits == 0 {
        return int_part.parse().unwrap_or(value);
    }

    let mut frac: String = frac_part.chars().take(digits).collect();
    while frac.len() < digits {
        frac.push('0');
    }

    format!("{int_part}.{frac}").parse().unwrap_or(value)
}
