//! Fetching the standards document: one page, a fixed list of pages, or a
//! crawl of every sub-page below the landing page.
//!
//! Nothing here writes to disk. A failed fetch aborts the whole download so the
//! caller never sees a partial page set.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Html};
use tracing::{debug, error, info, warn};

use crate::config::SourceConfig;
use crate::contract::{FetchError, Fetcher, Page};

/// `reqwest`-backed [`Fetcher`]. Build one per run and drop it afterwards.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build HTTP client");
                FetchError::Client(e)
            })?;
        debug!(timeout_secs = config.timeout_secs, "Built HTTP client");
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!(url = %url, "Fetching page");
        let response = self.client.get(url).send().await.map_err(|e| {
            error!(error = ?e, url = %url, "Request failed");
            FetchError::Transport {
                url: url.to_string(),
                source: e,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Server returned non-success status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to read response body");
            FetchError::Transport {
                url: url.to_string(),
                source: e,
            }
        })?;
        debug!(url = %url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

/// Host plus path prefix that crawled links must stay within.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlScope {
    host: String,
    path_prefix: String,
}

impl CrawlScope {
    /// Scope rooted at `start_url`. Without an explicit prefix the start URL's path is used.
    pub fn new(start_url: &str, path_prefix: Option<&str>) -> Result<Self, FetchError> {
        let url = parse_url(start_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl {
                url: start_url.to_string(),
                reason: "URL has no host".to_string(),
            })?
            .to_string();
        let prefix = path_prefix.unwrap_or(url.path());
        Ok(Self {
            host,
            path_prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn contains(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") || url.host_str() != Some(self.host.as_str())
        {
            return false;
        }
        if self.path_prefix.is_empty() {
            return true;
        }
        let path = url.path();
        path == self.path_prefix
            || path
                .strip_prefix(self.path_prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Absolute in-scope links of a page, fragment removed, deduplicated and sorted.
pub fn discover_links(page_url: &Url, html: &str, scope: &CrawlScope) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = BTreeSet::new();

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if element.value().name() != "a" {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(mut link) = page_url.join(href.trim()) else {
            debug!(href = %href, "Ignoring unparseable link");
            continue;
        };
        link.set_fragment(None);
        if scope.contains(&link) {
            links.insert(link.to_string());
        }
    }

    links.into_iter().collect()
}

/// Breadth-first crawl from `start_urls`, visiting each in-scope page once.
///
/// Pages are returned in visit order: start URLs first, then discovered links
/// in sorted order per page. Stops after `max_pages` pages.
pub async fn crawl<F>(
    fetcher: &F,
    start_urls: &[String],
    scope: &CrawlScope,
    max_pages: usize,
) -> Result<Vec<Page>, FetchError>
where
    F: Fetcher,
{
    let mut queue = VecDeque::new();
    let mut seen = HashSet::new();
    for url in start_urls {
        let url = normalise(url)?;
        if seen.insert(url.clone()) {
            queue.push_back(url);
        }
    }

    let mut pages = Vec::new();
    while let Some(url) = queue.pop_front() {
        if pages.len() >= max_pages {
            warn!(
                max_pages,
                skipped = queue.len() + 1,
                "Crawl page limit reached, remaining pages skipped"
            );
            break;
        }

        info!(url = %url, "Visiting");
        let html = fetcher.fetch(&url).await?;
        let base = parse_url(&url)?;
        let mut discovered = 0usize;
        for link in discover_links(&base, &html, scope) {
            if seen.insert(link.clone()) {
                queue.push_back(link);
                discovered += 1;
            }
        }
        debug!(url = %url, discovered, "Queued new links");
        pages.push(Page { url, html });
    }

    info!(pages = pages.len(), "Crawl finished");
    Ok(pages)
}

/// Fetch every page the source config describes, crawling if enabled.
pub async fn fetch_all<F>(config: &SourceConfig, fetcher: &F) -> Result<Vec<Page>, FetchError>
where
    F: Fetcher,
{
    let Some(first) = config.urls.first() else {
        warn!("No source URLs configured, nothing to fetch");
        return Ok(Vec::new());
    };

    if config.crawl {
        let scope = CrawlScope::new(first, config.path_prefix.as_deref())?;
        info!(scope = ?scope, max_pages = config.max_pages, "Crawling standards pages");
        return crawl(fetcher, &config.urls, &scope, config.max_pages).await;
    }

    let mut pages = Vec::with_capacity(config.urls.len());
    for url in &config.urls {
        let html = fetcher.fetch(url).await?;
        pages.push(Page {
            url: url.clone(),
            html,
        });
    }
    Ok(pages)
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn normalise(url: &str) -> Result<String, FetchError> {
    let mut parsed = parse_url(url)?;
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}
