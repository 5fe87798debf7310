//! Diff-log persistence.
//!
//! A diff log is an append-only text file holding one formatted [`Diff`]
//! per line, in detection order. Logs are created once per comparison run,
//! read forward-only during resolution, and never updated in place. Log
//! files accumulate in their target's config directory; nothing prunes
//! them automatically.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rand::Rng;
use tracing::debug;

use crate::diff::Diff;
use crate::errors::DiffError;

/// File extension of diff logs.
pub const LOG_EXTENSION: &str = "diff";

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Append-only writer for a new diff log.
///
/// Creating the writer creates a file named `YYYY-MM-DD-<n>.diff`, where
/// the date is the creation date and `n` is a random number avoiding
/// collisions between runs on the same day. The file handle is released
/// when the writer is dropped; call [`finish`](Self::finish) to flush
/// explicitly and learn about write errors.
#[derive(Debug)]
pub struct DiffLogWriter {
    path: PathBuf,
    file: BufWriter<File>,
}

impl DiffLogWriter {
    /// Create a uniquely named log file in `directory`.
    pub fn create(directory: &Path) -> Result<Self, DiffError> {
        let name = format!(
            "{}-{}.{}",
            Local::now().format("%Y-%m-%d"),
            rand::thread_rng().gen_range(1..1_000_000_000),
            LOG_EXTENSION
        );
        let path = directory.join(name);

        let file = BufWriter::new(File::create(&path)?);
        debug!(path = %path.display(), "created diff log");

        Ok(Self { path, file })
    }

    /// Where this log is being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one diff as a formatted line.
    pub fn append(&mut self, diff: &Diff) -> Result<(), DiffError> {
        let line = diff.to_line()?;
        writeln!(self.file, "{line}")?;
        Ok(())
    }

    /// Flush and release the file handle.
    pub fn finish(mut self) -> Result<PathBuf, DiffError> {
        self.file.flush()?;
        Ok(self.path)
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Forward-only reader over a diff log.
///
/// Yields diffs lazily in file order. Blank lines are skipped; a malformed
/// line yields an error and there is no recovery past it. The reader is
/// restartable only by reopening the file from the start.
#[derive(Debug)]
pub struct DiffLogReader {
    lines: Lines<BufReader<File>>,
}

impl DiffLogReader {
    /// Open a log file for reading.
    pub fn open(path: &Path) -> Result<Self, DiffError> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }
}

impl Iterator for DiffLogReader {
    type Item = Result<Diff, DiffError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(Diff::from_line(trimmed));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Log listing
// ---------------------------------------------------------------------------

/// Metadata of one stored diff log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMeta {
    /// Absolute path of the `.diff` file.
    pub path: PathBuf,
    /// Human-friendly creation timestamp (`%Y-%m-%d %H:%M:%S`).
    pub created_at: String,
}

/// List all diff logs in `directory`, oldest first.
///
/// Scans for regular files with the `.diff` extension; the creation
/// timestamp is taken from the file's modification time.
pub fn list_logs(directory: &Path) -> Result<Vec<LogMeta>, DiffError> {
    let mut logs = Vec::new();

    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();

        let is_log = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == LOG_EXTENSION);
        if !is_log {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        let created_at: DateTime<Local> = modified.into();
        logs.push(LogMeta {
            path,
            created_at: created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        });
    }

    logs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffType, ElementKind};

    fn sample(diff_type: DiffType) -> Diff {
        Diff::new(diff_type, ElementKind::File, "/s/a.txt", "/t/a.txt")
    }

    #[test]
    fn test_writer_creates_dated_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DiffLogWriter::create(dir.path()).unwrap();

        let name = writer.path().file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".diff"), "unexpected name {name}");

        let date_part = Local::now().format("%Y-%m-%d").to_string();
        assert!(name.starts_with(&date_part), "unexpected name {name}");

        let path = writer.finish().unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DiffLogWriter::create(dir.path()).unwrap();

        let diffs = vec![
            sample(DiffType::Positive),
            sample(DiffType::Older),
            Diff::new(DiffType::Positive, ElementKind::Directory, "/s/d", "/t/d"),
        ];
        for diff in &diffs {
            writer.append(diff).unwrap();
        }
        let path = writer.finish().unwrap();

        let read: Vec<Diff> = DiffLogReader::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, diffs);
    }

    #[test]
    fn test_reader_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-01-42.diff");
        fs::write(&path, "+:f:/s/a:/t/a\n\n\n-:f:/s/b:/t/b\n\n").unwrap();

        let read: Vec<Diff> = DiffLogReader::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[1].diff_type, DiffType::Negative);
    }

    #[test]
    fn test_malformed_line_fails_after_valid_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-01-43.diff");
        fs::write(&path, "+:f:/s/a:/t/a\n+:f:/only-three\n").unwrap();

        let mut reader = DiffLogReader::open(&path).unwrap();
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, DiffError::MalformedLine { .. }));
    }

    #[test]
    fn test_list_logs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2024-01-02-7.diff"), "").unwrap();
        fs::write(dir.path().join("2024-01-03-9.diff"), "").unwrap();
        fs::write(dir.path().join("target.json"), "{}").unwrap();

        let logs = list_logs(dir.path()).unwrap();
        assert_eq!(logs.len(), 2);
        for pair in logs.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[test]
    fn test_two_writers_same_day_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let first = DiffLogWriter::create(dir.path()).unwrap().finish().unwrap();
        let second = DiffLogWriter::create(dir.path()).unwrap().finish().unwrap();
        assert_ne!(first, second);
    }
}
