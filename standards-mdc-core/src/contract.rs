//! # contract: pipeline data types and the two I/O seams
//!
//! Everything the stages hand to each other lives here, together with the two
//! traits that touch the outside world:
//!
//! - [`Fetcher`]: retrieves the raw markup of a page (network).
//! - [`RuleSink`]: persists a formatted rule (filesystem).
//!
//! Both traits are annotated for `mockall`, so the orchestration in
//! [`crate::synchronise`] can be exercised without a network or a disk.
//! The mocks are exported when the `test-export-mocks` feature is enabled
//! (on by default), so integration tests under `tests/` can use them.

use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::Serialize;

/// One fetched page of the standards document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub html: String,
}

/// A piece of a rule body. Prose is reflowed onto one line; code is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Prose(String),
    Code {
        language: Option<String>,
        text: String,
    },
}

/// One coding-standard recommendation, extracted from one heading-delimited section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    /// Heading text of the section. Never empty.
    pub title: String,
    /// Prose and code in document order. May be empty.
    pub body: Vec<Segment>,
    /// The heading's anchor id, when the markup carries one.
    pub source_section_id: Option<String>,
}

/// A rule rendered into the destination tool's file convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedRule {
    pub filename: String,
    pub content: String,
}

/// What the sink did with a rule file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    /// The URL the failure relates to, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Client(_) => None,
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::InvalidUrl { url, .. } => Some(url),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to create output directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rule filename {filename:?}")]
    InvalidFilename { filename: String },
}

/// Retrieves the raw markup of a page.
///
/// Implementations return the body only for a 2xx response and never retry.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Persists formatted rules.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait RuleSink: Send + Sync {
    /// Write one rule, replacing any previous file of the same name.
    fn write(&self, rule: &FormattedRule) -> Result<WriteOutcome, WriteError>;
}
