//! High-level pipeline: fetch → extract → format → write.
//!
//! [`synchronise`] drives one run against any [`Fetcher`] and [`RuleSink`]:
//!
//!   - Fetches every configured page (crawling sub-pages when enabled). Any
//!     fetch failure aborts before a single file is written.
//!   - Extracts rules page by page, logging each skipped section as a warning.
//!   - Formats every rule and assigns collision-free filenames in document order.
//!   - Writes the rules one by one; the first write failure aborts the run.
//!
//! The returned [`SynchroniseReport`] lists every page and rule file of the run.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::contract::{FetchError, Fetcher, RuleSink, WriteError, WriteOutcome};
use crate::download;
use crate::extract::Extractor;
use crate::format::{FilenameAllocator, Formatter};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("fetch stage failed")]
    Fetch(#[from] FetchError),
    #[error("write stage failed")]
    Write(#[from] WriteError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynchroniseReport {
    pub pages: Vec<String>,
    pub rules: Vec<RuleReport>,
    pub warnings: usize,
}

impl SynchroniseReport {
    pub fn count(&self, outcome: WriteOutcome) -> usize {
        self.rules.iter().filter(|r| r.outcome == outcome).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub title: String,
    pub filename: String,
    pub outcome: WriteOutcome,
}

pub async fn synchronise<F, S>(
    config: &Config,
    fetcher: &F,
    sink: &S,
) -> Result<SynchroniseReport, SyncError>
where
    F: Fetcher,
    S: RuleSink,
{
    info!("[SYNC] Starting standards synchronisation");

    // --- Step 1: Fetch ---
    let pages = match download::fetch_all(&config.source, fetcher).await {
        Ok(pages) => {
            info!(pages = pages.len(), "[SYNC] Fetch succeeded");
            pages
        }
        Err(e) => {
            error!(error = ?e, url = ?e.url(), "[SYNC][ERROR] Fetch failed");
            return Err(e.into());
        }
    };

    // --- Step 2 + 3: Extract and format ---
    let extractor = Extractor::new(&config.extract);
    let formatter = Formatter::new(&config.output);
    let mut filenames = FilenameAllocator::default();
    let mut pending = Vec::new();
    let mut warnings = 0usize;

    for page in &pages {
        let extraction = extractor.extract(&page.html);
        for warning in &extraction.warnings {
            warn!(url = %page.url, warning = %warning, "[SYNC] Skipped section");
        }
        warnings += extraction.warnings.len();
        info!(
            url = %page.url,
            rules = extraction.rules.len(),
            skipped = extraction.warnings.len(),
            "[SYNC] Extracted rules from page"
        );

        for rule in extraction.rules {
            let mut formatted = formatter.format(&rule);
            formatted.filename = filenames.claim(&formatted.filename);
            pending.push((rule.title, formatted));
        }
    }

    // --- Step 4: Write ---
    let mut rules = Vec::with_capacity(pending.len());
    for (title, formatted) in pending {
        let outcome = sink.write(&formatted).map_err(|e| {
            error!(error = ?e, file = %formatted.filename, "[SYNC][ERROR] Write failed");
            e
        })?;
        rules.push(RuleReport {
            title,
            filename: formatted.filename,
            outcome,
        });
    }

    let report = SynchroniseReport {
        pages: pages.into_iter().map(|p| p.url).collect(),
        rules,
        warnings,
    };
    info!(
        pages = report.pages.len(),
        rules = report.rules.len(),
        created = report.count(WriteOutcome::Created),
        updated = report.count(WriteOutcome::Updated),
        unchanged = report.count(WriteOutcome::Unchanged),
        warnings,
        "[SYNC] Synchronisation complete"
    );
    Ok(report)
}
