//! Diff resolution.
//!
//! The resolver replays a diff log in order and applies, per record, the
//! action selected for that record's type: skip, apply, or ask. "Ask"
//! consults an injected [`DecisionProvider`], so the resolver itself never
//! talks to a terminal and is a pure function of (log, modes, provider).
//!
//! Resolution is not transactional: a malformed log line aborts the run,
//! but records applied before the failure stay applied.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use crate::diff::log::DiffLogReader;
use crate::diff::{Diff, DiffType};
use crate::errors::ResolveError;

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// Per-type action policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Leave the filesystem untouched.
    Skip,
    /// Perform the type-dependent copy.
    Apply,
    /// Defer to the decision provider, then apply or skip.
    Ask,
}

impl Mode {
    fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(Self::Skip),
            '1' => Some(Self::Apply),
            '2' => Some(Self::Ask),
            _ => None,
        }
    }
}

/// One [`Mode`] per [`DiffType`], in ordinal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes([Mode; 5]);

impl Modes {
    pub fn new(modes: [Mode; 5]) -> Self {
        Self(modes)
    }

    /// Parse a 5-digit mode string such as `"01210"`.
    ///
    /// Fails before any mutation if the arity is wrong or a digit is
    /// outside `{0, 1, 2}`.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let digits: Vec<char> = raw.chars().collect();
        if digits.len() != 5 {
            return Err(ResolveError::InvalidModes {
                modes: raw.to_string(),
                detail: format!("expected 5 modes, found {}", digits.len()),
            });
        }

        let mut modes = [Mode::Skip; 5];
        for (slot, digit) in modes.iter_mut().zip(digits) {
            *slot = Mode::from_digit(digit).ok_or_else(|| ResolveError::InvalidModes {
                modes: raw.to_string(),
                detail: format!("mode '{digit}' is out of range"),
            })?;
        }

        Ok(Self(modes))
    }

    /// The mode selected for a diff type.
    pub fn for_type(&self, diff_type: DiffType) -> Mode {
        self.0[diff_type.ordinal()]
    }
}

// ---------------------------------------------------------------------------
// Decision provider
// ---------------------------------------------------------------------------

/// Interactive decision capability consulted for `ask`-mode diffs.
///
/// Implementations present the diff to a human (or a test script) and
/// answer whether it should be applied. A non-affirmative answer means
/// skip.
pub trait DecisionProvider {
    fn decide(&mut self, diff: &Diff) -> io::Result<bool>;
}

/// Provider that skips every diff; useful where no interaction is
/// possible.
#[derive(Debug, Default)]
pub struct DenyAll;

impl DecisionProvider for DenyAll {
    fn decide(&mut self, _diff: &Diff) -> io::Result<bool> {
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Counters describing one resolution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOutcome {
    /// Records whose copy action was performed.
    pub applied: u64,
    /// Records skipped by policy, by decision, or because the action is
    /// not implemented.
    pub skipped: u64,
    /// Records whose element had vanished from disk by resolution time.
    pub missing: u64,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

enum CopyStatus {
    Copied,
    SourceVanished,
}

/// Replay `reader` and apply the per-type policy to every record, in log
/// order.
pub fn resolve(
    reader: DiffLogReader,
    modes: &Modes,
    provider: &mut dyn DecisionProvider,
) -> Result<ResolveOutcome, ResolveError> {
    let mut outcome = ResolveOutcome::default();

    for record in reader {
        let diff = record?;

        let mut mode = modes.for_type(diff.diff_type);
        if mode == Mode::Ask {
            mode = if provider.decide(&diff)? {
                Mode::Apply
            } else {
                Mode::Skip
            };
        }

        match mode {
            Mode::Skip => {
                info!(
                    source = %diff.source.display(),
                    target = %diff.target.display(),
                    "skipping diff"
                );
                outcome.skipped += 1;
            }
            Mode::Apply => apply(&diff, &mut outcome)?,
            Mode::Ask => unreachable!("ask downgraded above"),
        }
    }

    Ok(outcome)
}

fn apply(diff: &Diff, outcome: &mut ResolveOutcome) -> Result<(), ResolveError> {
    let status = match diff.diff_type {
        DiffType::Positive | DiffType::Newer | DiffType::Unknown => {
            copy_element(&diff.source, &diff.target)?
        }
        DiffType::Older => copy_element(&diff.target, &diff.source)?,
        DiffType::Negative => {
            // TODO: implement deletion once a trash/undo story exists.
            warn!(
                target = %diff.target.display(),
                "target should be deleted but deletion is not implemented yet"
            );
            outcome.skipped += 1;
            return Ok(());
        }
    };

    match status {
        CopyStatus::Copied => outcome.applied += 1,
        CopyStatus::SourceVanished => outcome.missing += 1,
    }
    Ok(())
}

/// Copy one element, file or directory, from `from` over `to`.
///
/// Files are copied byte-for-byte with the modification time carried
/// over. Directories are materialized shallowly: the directory itself is
/// created and its immediate file children are copied; nested
/// subdirectories are not descended into. An element that no longer
/// exists on disk is reported, not an error.
fn copy_element(from: &Path, to: &Path) -> Result<CopyStatus, ResolveError> {
    if from.is_file() {
        copy_file_with_mtime(from, to)?;
        info!(from = %from.display(), to = %to.display(), "copied file");
        return Ok(CopyStatus::Copied);
    }

    if from.is_dir() {
        match fs::create_dir(to) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }

        for entry in fs::read_dir(from)? {
            let entry = entry?;
            let child = entry.path();
            if child.is_file() {
                let dest = to.join(entry.file_name());
                copy_file_with_mtime(&child, &dest)?;
                info!(from = %child.display(), to = %dest.display(), "copied file");
            }
        }
        return Ok(CopyStatus::Copied);
    }

    warn!(path = %from.display(), "element no longer exists, skipping");
    Ok(CopyStatus::SourceVanished)
}

fn copy_file_with_mtime(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;

    let metadata = fs::metadata(from)?;
    let mtime = filetime::FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(to, mtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::log::DiffLogWriter;
    use crate::diff::ElementKind;

    use std::path::PathBuf;

    /// Provider that returns scripted answers and records what was asked.
    #[derive(Default)]
    struct Scripted {
        answers: Vec<bool>,
        asked: Vec<Diff>,
    }

    impl DecisionProvider for Scripted {
        fn decide(&mut self, diff: &Diff) -> io::Result<bool> {
            self.asked.push(diff.clone());
            Ok(self.answers.remove(0))
        }
    }

    fn write_log(dir: &Path, diffs: &[Diff]) -> PathBuf {
        let mut writer = DiffLogWriter::create(dir).unwrap();
        for diff in diffs {
            writer.append(diff).unwrap();
        }
        writer.finish().unwrap()
    }

    fn reader(path: &Path) -> DiffLogReader {
        DiffLogReader::open(path).unwrap()
    }

    #[test]
    fn test_modes_parse_valid() {
        let modes = Modes::parse("01210").unwrap();
        assert_eq!(modes.for_type(DiffType::Positive), Mode::Skip);
        assert_eq!(modes.for_type(DiffType::Negative), Mode::Apply);
        assert_eq!(modes.for_type(DiffType::Newer), Mode::Ask);
        assert_eq!(modes.for_type(DiffType::Older), Mode::Apply);
        assert_eq!(modes.for_type(DiffType::Unknown), Mode::Skip);
    }

    #[test]
    fn test_modes_parse_wrong_arity() {
        for raw in ["0123", "012345", ""] {
            let err = Modes::parse(raw).unwrap_err();
            assert!(matches!(err, ResolveError::InvalidModes { .. }), "{raw}");
        }
    }

    #[test]
    fn test_modes_parse_out_of_range_digit() {
        let err = Modes::parse("01230").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidModes { .. }));
    }

    #[test]
    fn test_skip_mode_never_mutates() {
        let work = tempfile::tempdir().unwrap();
        let source_file = work.path().join("a.txt");
        let target_file = work.path().join("copy-of-a.txt");
        fs::write(&source_file, "content").unwrap();

        let log = write_log(
            work.path(),
            &[Diff::new(
                DiffType::Positive,
                ElementKind::File,
                &source_file,
                &target_file,
            )],
        );

        let outcome = resolve(
            reader(&log),
            &Modes::parse("00000").unwrap(),
            &mut DenyAll,
        )
        .unwrap();

        assert!(!target_file.exists());
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.applied, 0);
    }

    #[test]
    fn test_apply_positive_copies_source_to_target() {
        let work = tempfile::tempdir().unwrap();
        let source_file = work.path().join("a.txt");
        let target_file = work.path().join("b.txt");
        fs::write(&source_file, "payload").unwrap();

        let log = write_log(
            work.path(),
            &[Diff::new(
                DiffType::Positive,
                ElementKind::File,
                &source_file,
                &target_file,
            )],
        );

        let outcome = resolve(
            reader(&log),
            &Modes::parse("10000").unwrap(),
            &mut DenyAll,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&target_file).unwrap(), "payload");
        assert_eq!(outcome.applied, 1);
    }

    #[test]
    fn test_apply_older_copies_target_to_source() {
        let work = tempfile::tempdir().unwrap();
        let source_file = work.path().join("b.txt");
        let target_file = work.path().join("b-target.txt");
        fs::write(&source_file, "stale").unwrap();
        fs::write(&target_file, "fresh").unwrap();

        let log = write_log(
            work.path(),
            &[Diff::new(
                DiffType::Older,
                ElementKind::File,
                &source_file,
                &target_file,
            )],
        );

        let outcome = resolve(
            reader(&log),
            &Modes::parse("00010").unwrap(),
            &mut DenyAll,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&source_file).unwrap(), "fresh");
        assert_eq!(outcome.applied, 1);
    }

    #[test]
    fn test_apply_preserves_mtime() {
        let work = tempfile::tempdir().unwrap();
        let source_file = work.path().join("a.txt");
        let target_file = work.path().join("b.txt");
        fs::write(&source_file, "payload").unwrap();
        filetime::set_file_mtime(
            &source_file,
            filetime::FileTime::from_unix_time(1_600_000_000, 0),
        )
        .unwrap();

        let log = write_log(
            work.path(),
            &[Diff::new(
                DiffType::Positive,
                ElementKind::File,
                &source_file,
                &target_file,
            )],
        );

        resolve(reader(&log), &Modes::parse("10000").unwrap(), &mut DenyAll).unwrap();

        let copied = filetime::FileTime::from_last_modification_time(
            &fs::metadata(&target_file).unwrap(),
        );
        assert_eq!(copied.unix_seconds(), 1_600_000_000);
    }

    #[test]
    fn test_ask_applies_on_yes_skips_on_no() {
        let work = tempfile::tempdir().unwrap();
        let first_source = work.path().join("one.txt");
        let second_source = work.path().join("two.txt");
        fs::write(&first_source, "1").unwrap();
        fs::write(&second_source, "2").unwrap();
        let first_target = work.path().join("one-copy.txt");
        let second_target = work.path().join("two-copy.txt");

        let log = write_log(
            work.path(),
            &[
                Diff::new(DiffType::Positive, ElementKind::File, &first_source, &first_target),
                Diff::new(DiffType::Positive, ElementKind::File, &second_source, &second_target),
            ],
        );

        let mut provider = Scripted {
            answers: vec![true, false],
            asked: Vec::new(),
        };
        let outcome = resolve(
            reader(&log),
            &Modes::parse("20000").unwrap(),
            &mut provider,
        )
        .unwrap();

        assert!(first_target.exists());
        assert!(!second_target.exists());
        assert_eq!(provider.asked.len(), 2);
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_negative_apply_only_logs_pending_deletion() {
        let work = tempfile::tempdir().unwrap();
        let target_file = work.path().join("obsolete.txt");
        fs::write(&target_file, "still here").unwrap();

        let log = write_log(
            work.path(),
            &[Diff::new(
                DiffType::Negative,
                ElementKind::File,
                work.path().join("gone.txt"),
                &target_file,
            )],
        );

        let outcome = resolve(
            reader(&log),
            &Modes::parse("01000").unwrap(),
            &mut DenyAll,
        )
        .unwrap();

        // Deletion is not implemented: the target must survive.
        assert!(target_file.exists());
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_vanished_element_is_noticed_not_fatal() {
        let work = tempfile::tempdir().unwrap();
        let log = write_log(
            work.path(),
            &[Diff::new(
                DiffType::Positive,
                ElementKind::File,
                work.path().join("vanished.txt"),
                work.path().join("never.txt"),
            )],
        );

        let outcome = resolve(
            reader(&log),
            &Modes::parse("10000").unwrap(),
            &mut DenyAll,
        )
        .unwrap();

        assert_eq!(outcome.missing, 1);
        assert_eq!(outcome.applied, 0);
    }

    #[test]
    fn test_directory_copy_is_shallow() {
        let work = tempfile::tempdir().unwrap();
        let source_dir = work.path().join("assets");
        fs::create_dir(&source_dir).unwrap();
        fs::write(source_dir.join("logo.png"), "png").unwrap();
        fs::create_dir(source_dir.join("nested")).unwrap();
        fs::write(source_dir.join("nested").join("deep.txt"), "deep").unwrap();

        let target_dir = work.path().join("assets-copy");
        let log = write_log(
            work.path(),
            &[Diff::new(
                DiffType::Positive,
                ElementKind::Directory,
                &source_dir,
                &target_dir,
            )],
        );

        resolve(reader(&log), &Modes::parse("10000").unwrap(), &mut DenyAll).unwrap();

        assert!(target_dir.is_dir());
        assert!(target_dir.join("logo.png").is_file());
        // Immediate children only; the nested subdirectory is not copied.
        assert!(!target_dir.join("nested").exists());
    }

    #[test]
    fn test_malformed_line_aborts_but_keeps_prior_applications() {
        let work = tempfile::tempdir().unwrap();
        let source_file = work.path().join("good.txt");
        let target_file = work.path().join("good-copy.txt");
        fs::write(&source_file, "ok").unwrap();

        let good = Diff::new(DiffType::Positive, ElementKind::File, &source_file, &target_file);
        let log_path = work.path().join("2024-01-01-1.diff");
        fs::write(
            &log_path,
            format!("{}\nbroken-line\n", good.to_line().unwrap()),
        )
        .unwrap();

        let err = resolve(
            reader(&log_path),
            &Modes::parse("10000").unwrap(),
            &mut DenyAll,
        )
        .unwrap_err();

        assert!(matches!(err, ResolveError::Log(_)));
        // The record before the malformed line stays applied.
        assert!(target_file.exists());
    }
}
