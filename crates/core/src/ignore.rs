//! Ignore-pattern matching for tree comparison.
//!
//! Patterns are glob-lite: `*` matches zero or more word or space
//! characters, every other character is literal. A pattern is matched
//! against the bare path segment (file or directory base name), never the
//! full path, and must match the whole segment. The control directory's
//! own name is always excluded, whatever the configured patterns say.

use regex_lite::Regex;
use tracing::debug;

use crate::errors::WorkspaceError;
use crate::workspace::CONTROL_DIR;

/// Compiled ignore patterns.
#[derive(Debug)]
pub struct IgnoreMatcher {
    patterns: Vec<(String, Regex)>,
}

impl IgnoreMatcher {
    /// Compile a pattern list.
    pub fn new(patterns: &[String]) -> Result<Self, WorkspaceError> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let regex = Regex::new(&to_regex(pattern)).map_err(|e| {
                WorkspaceError::MalformedConfig {
                    path: pattern.clone(),
                    detail: format!("invalid ignore pattern: {e}"),
                }
            })?;
            compiled.push((pattern.clone(), regex));
        }

        Ok(Self { patterns: compiled })
    }

    /// A matcher that excludes nothing beyond the control directory.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Whether `segment` is excluded from comparison.
    pub fn is_ignored(&self, segment: &str) -> bool {
        if segment == CONTROL_DIR {
            return true;
        }

        for (pattern, regex) in &self.patterns {
            if regex.is_match(segment) {
                debug!(segment, pattern, "segment matches ignore pattern");
                return true;
            }
        }

        false
    }
}

/// Translate a glob-lite pattern into an anchored regex.
///
/// `*` becomes `[\w ]*`; everything else is escaped so it matches
/// literally.
fn to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(r"[\w ]*"),
            c if c.is_ascii_punctuation() => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('$');
    out
}
