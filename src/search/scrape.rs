//! Direct HTTP scrape of a search engine result page

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::config::SearchConfig;
use crate::models::{RawHit, truncate_with_ellipsis};
use crate::search::fanout::{HttpPageFetcher, PageFetcher, fetch_pages};
use crate::search::html::{MAX_PAGE_CHARS, PageContent, parse_result_page};
use crate::search::{BackendError, SearchBackend};

/// Links followed from a result page, with the fan-out limits applied
struct LinkFollowing {
    fetcher: Arc<dyn PageFetcher>,
    max_links: usize,
    permits: usize,
    /// Time from the start of a search after which pending link fetches are dropped
    budget: Duration,
}

/// Share of the backend timeout available to a search that follows links.
/// The rest is left so the snippet hits are returned before the aggregator gives up.
fn link_budget(backend_timeout: Duration) -> Duration {
    backend_timeout.mul_f64(0.75)
}

/// Scrapes a Bing-compatible result page over plain HTTP
pub struct DirectScrapeBackend {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    following: Option<LinkFollowing>,
}

impl DirectScrapeBackend {
    pub fn new(config: &SearchConfig) -> Result<Self, BackendError> {
        let backend_timeout = Duration::from_secs(config.backend_timeout_secs);
        let client = reqwest::Client::builder().timeout(backend_timeout).build()?;

        let mut backend = Self {
            client: client.clone(),
            base_url: config.scrape_base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            following: None,
        };
        if config.follow_links {
            backend = backend.with_link_following(
                Arc::new(HttpPageFetcher::with_client(client, &config.user_agent)),
                config.max_followed_links,
                config.max_concurrent_requests,
                link_budget(backend_timeout),
            );
        }
        Ok(backend)
    }

    /// Follows result links through `fetcher`, replacing each hit's content with page text.
    ///
    /// Links not fetched within `budget` of the search starting keep their snippet.
    pub fn with_link_following(
        mut self,
        fetcher: Arc<dyn PageFetcher>,
        max_links: usize,
        permits: usize,
        budget: Duration,
    ) -> Self {
        self.following = Some(LinkFollowing {
            fetcher,
            max_links,
            permits,
            budget,
        });
        self
    }

    async fn fetch_result_page(&self, query: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query)])
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

        Ok(response.text().await?)
    }
}

fn page_text(page: &PageContent) -> String {
    let text = [page.title.as_str(), page.description.as_str(), page.text.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    if text.chars().count() > MAX_PAGE_CHARS {
        truncate_with_ellipsis(&text, MAX_PAGE_CHARS)
    } else {
        text
    }
}

#[async_trait]
impl SearchBackend for DirectScrapeBackend {
    fn name(&self) -> &str {
        "scrape"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, BackendError> {
        let started = Instant::now();
        let html = self.fetch_result_page(query).await?;
        let mut hits = parse_result_page(&html, "bing", max_results)?;
        debug!("Scrape backend parsed {} hits", hits.len());

        if let Some(following) = &self.following {
            let urls: Vec<String> = hits.iter().map(|h| h.url.clone()).collect();
            let pages = fetch_pages(
                Arc::clone(&following.fetcher),
                &urls,
                following.max_links,
                following.permits,
                started + following.budget,
            )
            .await;
            let by_url: HashMap<&str, &PageContent> =
                pages.iter().map(|p| (p.url.as_str(), p)).collect();

            for hit in hits.iter_mut() {
                if let Some(page) = by_url.get(hit.url.as_str()) {
                    let text = page_text(page);
                    if !text.is_empty() {
                        hit.content = text;
                        hit.metadata
                            .insert("followed".to_string(), serde_json::Value::Bool(true));
                    }
                }
            }
        }

        Ok(hits)
    }
}
