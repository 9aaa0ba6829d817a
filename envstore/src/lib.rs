//! Idempotent key/value persistence over a flat `KEY=VALUE` file.
//!
//! Reconciliation brings the backing file to contain at least the required
//! entries without touching existing values: missing keys are appended,
//! keys already present are left exactly as found. Running the same
//! reconciliation any number of times produces no duplicate lines and no
//! value changes after the first write.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors related to the environment file store
#[derive(Error, Debug)]
pub enum EnvStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EnvStoreResult<T> = Result<T, EnvStoreError>;

/// A single `key=value` line in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}

impl EnvEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Per-key outcome of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The key was missing and its `key=value` line was appended
    Added,
    /// A line for the key already existed; its value was left untouched
    AlreadyPresent,
}

impl std::fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnsureOutcome::Added => write!(f, "added"),
            EnsureOutcome::AlreadyPresent => write!(f, "already present"),
        }
    }
}

/// Summary of one `ensure_entries` call.
#[derive(Debug, Clone)]
pub struct EnsureReport {
    /// (key, outcome) in the order the entries were required
    pub outcomes: Vec<(String, EnsureOutcome)>,
}

impl EnsureReport {
    /// Number of keys appended by this pass
    pub fn added(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == EnsureOutcome::Added)
            .count()
    }

    /// Human-readable per-key summary, one line per entry
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (key, outcome) in &self.outcomes {
            out.push_str(&format!("{}: {}\n", key, outcome));
        }
        out
    }
}

/// Flat-file `KEY=VALUE` store at a fixed path.
#[derive(Debug, Clone)]
pub struct EnvStore {
    path: PathBuf,
}

impl EnvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reconcile the backing file with the required entries.
    ///
    /// The file is created if absent. For each entry, a `key=value` line is
    /// appended only when no `key=` line exists yet; an existing key's value
    /// is never overwritten. Safe to call repeatedly with the same entries.
    pub fn ensure_entries(&self, required: &[EnvEntry]) -> EnvStoreResult<EnsureReport> {
        let existing = self.read_or_empty()?;
        let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();
        let mut outcomes = Vec::with_capacity(required.len());

        for entry in required {
            let prefix = format!("{}=", entry.key);
            if lines.iter().any(|line| line.starts_with(&prefix)) {
                outcomes.push((entry.key.clone(), EnsureOutcome::AlreadyPresent));
            } else {
                lines.push(format!("{}={}", entry.key, entry.value));
                outcomes.push((entry.key.clone(), EnsureOutcome::Added));
            }
        }

        let report = EnsureReport { outcomes };
        if report.added() > 0 || !self.path.exists() {
            self.write_atomic(&lines)?;
        }
        Ok(report)
    }

    /// Current file contents, or empty if the file does not exist yet.
    pub fn contents(&self) -> EnvStoreResult<String> {
        self.read_or_empty()
    }

    fn read_or_empty(&self) -> EnvStoreResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    // Write to a sibling temp file, then rename over the target. Observable
    // behavior matches plain append; the rename avoids torn writes.
    fn write_atomic(&self, lines: &[String]) -> EnvStoreResult<()> {
        let mut body = lines.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
