//! Concurrent page fetching for followed result links

use async_trait::async_trait;
use futures_util::future::join_all;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::search::BackendError;
use crate::search::html::{PageContent, extract_page};

/// Desktop user agent sent when no other is configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
});

/// Fetches and extracts one page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageContent, BackendError>;
}

/// `PageFetcher` over plain HTTP GET
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpPageFetcher {
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: HTTP_CLIENT.clone(),
            user_agent: user_agent.to_string(),
        }
    }

    pub fn with_client(client: reqwest::Client, user_agent: &str) -> Self {
        Self {
            client,
            user_agent: user_agent.to_string(),
        }
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, BackendError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let html = response.text().await?;
        extract_page(url, &html)
    }
}

/// Fetches up to `max_links` pages concurrently with at most `permits`
/// requests in flight.
///
/// Failed fetches and fetches still pending at `deadline` are dropped.
/// Results keep the order of `urls`.
pub async fn fetch_pages(
    fetcher: Arc<dyn PageFetcher>,
    urls: &[String],
    max_links: usize,
    permits: usize,
    deadline: Instant,
) -> Vec<PageContent> {
    let semaphore = Arc::new(Semaphore::new(permits.max(1)));

    let tasks = urls.iter().take(max_links).map(|url| {
        let fetcher = Arc::clone(&fetcher);
        let semaphore = Arc::clone(&semaphore);
        async move {
            let fetch = async {
                let _permit = semaphore.acquire().await.ok()?;
                Some(fetcher.fetch(url).await)
            };
            match tokio::time::timeout_at(deadline, fetch).await {
                Ok(Some(Ok(page))) => {
                    debug!("Fetched {} ({} chars)", url, page.text.len());
                    Some(page)
                }
                Ok(Some(Err(e))) => {
                    warn!("Failed to fetch {}: {}", url, e);
                    None
                }
                Ok(None) => None,
                Err(_) => {
                    warn!("Gave up on {}: link budget exhausted", url);
                    None
                }
            }
        }
    });

    join_all(tasks).await.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<PageContent, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.ends_with("/slow") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if url.ends_with("/broken") {
                return Err(BackendError::Parse("broken page".into()));
            }
            Ok(PageContent {
                url: url.to_string(),
                text: format!("text of {url}"),
                ..Default::default()
            })
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://site{i}.example/page")).collect()
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_permits() {
        let fetcher = Arc::new(CountingFetcher::new());
        let pages = fetch_pages(fetcher.clone(), &urls(12), 10, 3, far_deadline()).await;

        assert_eq!(pages.len(), 10);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 10);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_failures_dropped_and_order_kept() {
        let fetcher = Arc::new(CountingFetcher::new());
        let input = vec![
            "https://a.example/one".to_string(),
            "https://b.example/broken".to_string(),
            "https://c.example/three".to_string(),
        ];

        let pages = fetch_pages(fetcher, &input, 10, 5, far_deadline()).await;
        let fetched: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(fetched, vec!["https://a.example/one", "https://c.example/three"]);
    }

    #[tokio::test]
    async fn test_pending_fetches_dropped_at_deadline() {
        let fetcher = Arc::new(CountingFetcher::new());
        let input = vec![
            "https://a.example/one".to_string(),
            "https://b.example/slow".to_string(),
            "https://c.example/three".to_string(),
        ];

        let started = Instant::now();
        let deadline = started + Duration::from_millis(200);
        let pages = fetch_pages(fetcher, &input, 10, 5, deadline).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        let fetched: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(fetched, vec!["https://a.example/one", "https://c.example/three"]);
    }
}
