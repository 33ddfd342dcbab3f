//! Filesystem [`RuleSink`]: one file per rule in a single output directory.
//!
//! Files whose content is already up to date are left untouched, so a re-run
//! against unchanged markup neither rewrites nor reorders anything.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::contract::{FormattedRule, RuleSink, WriteError, WriteOutcome};

pub struct DirectoryWriter {
    output_dir: PathBuf,
}

impl DirectoryWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory (and parents) if missing.
    pub fn ensure_output_dir(&self) -> Result<(), WriteError> {
        if self.output_dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            error!(
                error = ?e,
                path = %self.output_dir.display(),
                "Failed to create output directory"
            );
            WriteError::CreateDir {
                path: self.output_dir.clone(),
                source: e,
            }
        })?;
        debug!(path = %self.output_dir.display(), "Created output directory");
        Ok(())
    }
}

impl RuleSink for DirectoryWriter {
    fn write(&self, rule: &FormattedRule) -> Result<WriteOutcome, WriteError> {
        validate_filename(&rule.filename)?;
        self.ensure_output_dir()?;

        let path = self.output_dir.join(&rule.filename);
        let io_error = |e: std::io::Error| {
            error!(error = ?e, file = %path.display(), "Failed to write rule file");
            WriteError::Io {
                path: path.clone(),
                source: e,
            }
        };

        let outcome = match fs::read(&path) {
            Ok(existing) if existing == rule.content.as_bytes() => {
                debug!(file = %path.display(), "Rule file is up to date");
                return Ok(WriteOutcome::Unchanged);
            }
            Ok(_) => WriteOutcome::Updated,
            Err(e) if e.kind() == ErrorKind::NotFound => WriteOutcome::Created,
            Err(e) => return Err(io_error(e)),
        };

        fs::write(&path, rule.content.as_bytes()).map_err(io_error)?;
        info!(file = %path.display(), outcome = ?outcome, "Wrote rule file");
        Ok(outcome)
    }
}

/// A bare file name: no separators, no `.`/`..`, no control characters.
pub fn validate_filename(filename: &str) -> Result<(), WriteError> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || filename.chars().any(char::is_control);
    if invalid {
        error!(filename = %filename, "Refusing to write rule with invalid filename");
        return Err(WriteError::InvalidFilename {
            filename: filename.to_string(),
        });
    }
    Ok(())
}
