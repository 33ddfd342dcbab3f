use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Landing page of the Drupal coding standards.
pub const DEFAULT_STANDARDS_URL: &str = "https://www.drupal.org/docs/develop/standards";

/// Complete run configuration. Every section falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            urls = self.source.urls.len(),
            crawl = self.source.crawl,
            output_dir = %self.output.dir.display(),
            extension = %self.output.extension,
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

/// Where the standards document lives and how to fetch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub urls: Vec<String>,
    /// Follow links to sub-pages below `path_prefix`.
    pub crawl: bool,
    /// Defaults to the path of the first URL.
    pub path_prefix: Option<String>,
    pub max_pages: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            urls: vec![DEFAULT_STANDARDS_URL.to_string()],
            crawl: true,
            path_prefix: None,
            max_pages: 200,
            timeout_secs: 30,
            user_agent: concat!("standards-mdc/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Heuristics for turning markup sections into rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    /// Heading levels that open a new rule.
    pub heading_levels: Vec<u8>,
    /// Titles shorter than this (in characters) are skipped.
    pub min_title_len: usize,
    /// Titles containing any of these (case-insensitive) are skipped.
    pub skip_title_keywords: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            heading_levels: vec![2, 3],
            min_title_len: 3,
            skip_title_keywords: vec!["example".to_string()],
        }
    }
}

/// Shape and location of the generated rule files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub extension: String,
    pub globs: String,
    pub always_apply: bool,
    /// Fence language for code blocks whose markup names none.
    pub code_language: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".cursor/rules"),
            extension: "mdc".to_string(),
            globs: String::new(),
            always_apply: false,
            code_language: None,
        }
    }
}
