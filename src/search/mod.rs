//! Search backends
//!
//! Each backend performs one search attempt against one provider and returns
//! raw hits. The aggregator chains them in priority order.

pub mod browser;
#[cfg(feature = "browser")]
pub mod chromium;
pub mod fanout;
pub mod hosted;
pub mod html;
pub mod scrape;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::RawHit;

pub use browser::{BrowserLauncher, BrowserSession, PrimaryBrowserBackend, SessionPool};
pub use fanout::{HttpPageFetcher, PageFetcher, fetch_pages};
pub use hosted::HostedCrawlBackend;
pub use scrape::DirectScrapeBackend;

/// Errors raised by a single backend attempt
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("backend not configured: {0}")]
    NotConfigured(String),
}

/// One search provider
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short tag recorded as `source_tag` on every hit this backend yields
    fn name(&self) -> &str;

    /// Run one search. Must be idempotent.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, BackendError>;
}

/// Normalizes a URL for deduplication.
///
/// Scheme and host are lower-cased, the fragment is removed and a trailing
/// path slash is trimmed (except for the root path). Non-http(s) or
/// unparseable URLs yield `None`.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = url::Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()?;
    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    let normalized = url.to_string();
    // Url always renders the root path as "/"; strip it when there is nothing after it
    if url.path() == "/" && url.query().is_none() {
        return Some(normalized.trim_end_matches('/').to_string());
    }
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://Example.COM/a/b/", Some("https://example.com/a/b"))]
    #[case("https://example.com/a#section", Some("https://example.com/a"))]
    #[case("HTTP://example.com", Some("http://example.com"))]
    #[case("https://example.com/", Some("https://example.com"))]
    #[case("https://example.com/?q=1", Some("https://example.com/?q=1"))]
    #[case("https://example.com/a/?q=1", Some("https://example.com/a?q=1"))]
    #[case("  https://example.com/x  ", Some("https://example.com/x"))]
    #[case("ftp://example.com/file", None)]
    #[case("not a url", None)]
    #[case("", None)]
    fn test_normalize_url(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_url(raw).as_deref(), expected);
    }

    #[test]
    fn test_equivalent_urls_share_a_key() {
        assert_eq!(
            normalize_url("https://example.com/page/"),
            normalize_url("https://EXAMPLE.com/page#top")
        );
    }
}
