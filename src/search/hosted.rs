//! Hosted crawl/search API backend (Firecrawl-compatible)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::HostedCrawlConfig;
use crate::models::{RawHit, truncate_with_ellipsis};
use crate::search::{BackendError, SearchBackend};

const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct HostedSearchResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Vec<HostedSearchItem>,
}

#[derive(Debug, Deserialize)]
struct HostedSearchItem {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
}

/// Hosted crawl API client
pub struct HostedCrawlBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HostedCrawlBackend {
    pub fn new(config: &HostedCrawlConfig, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }
}

#[async_trait]
impl SearchBackend for HostedCrawlBackend {
    fn name(&self) -> &str {
        "firecrawl"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, BackendError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::NotConfigured("hosted crawl API key missing".into()))?;

        let response = self
            .client
            .post(format!("{}/v1/search", self.base_url))
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "query": query,
                "limit": max_results,
            }))
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

        let payload: HostedSearchResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(format!("invalid hosted search response: {e}")))?;

        if payload.success == Some(false) {
            return Err(BackendError::Parse(
                payload
                    .error
                    .unwrap_or_else(|| "hosted search reported failure".into()),
            ));
        }

        let hits: Vec<RawHit> = payload
            .data
            .into_iter()
            .filter(|item| !item.url.trim().is_empty())
            .take(max_results)
            .map(|item| {
                let description = item.description.unwrap_or_default();
                let content = item
                    .markdown
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| description.clone());
                let snippet = if description.trim().is_empty() {
                    truncate_with_ellipsis(&content, SNIPPET_CHARS)
                } else {
                    description
                };
                let title = item.title.unwrap_or_else(|| "No Title".to_string());

                RawHit::new(&title, &item.url, &content)
                    .with_snippet(&snippet)
                    .with_metadata("source", "firecrawl")
            })
            .collect();

        debug!("Hosted crawl returned {} hits", hits.len());
        Ok(hits)
    }
}
