//! Search result aggregation across a prioritized backend chain

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{BackendFailure, ResearchError};
use crate::models::{RawHit, SearchHit};
use crate::observability::ResearchMetrics;
use crate::search::{BackendError, SearchBackend, normalize_url};
use crate::services::enrichment::{analyze_sentiment, extract_insights};

/// Runs backends in priority order until enough distinct hits are collected
pub struct ResultAggregator {
    backends: Vec<Arc<dyn SearchBackend>>,
    min_results: usize,
    backend_timeout: Duration,
    metrics: Option<Arc<ResearchMetrics>>,
}

impl ResultAggregator {
    pub fn new(
        backends: Vec<Arc<dyn SearchBackend>>,
        min_results: usize,
        backend_timeout: Duration,
    ) -> Self {
        Self {
            backends,
            min_results,
            backend_timeout,
            metrics: None,
        }
    }

    pub fn from_config(backends: Vec<Arc<dyn SearchBackend>>, config: &SearchConfig) -> Self {
        Self::new(
            backends,
            config.min_results,
            Duration::from_secs(config.backend_timeout_secs),
        )
    }

    pub fn with_metrics(mut self, metrics: Arc<ResearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Backend names in priority order
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    async fn call_backend(
        &self,
        backend: &dyn SearchBackend,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RawHit>, BackendError> {
        match tokio::time::timeout(self.backend_timeout, backend.search(query, max_results)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.backend_timeout)),
        }
    }

    /// Aggregates hits for `query`.
    ///
    /// Returns `AllBackendsFailed` only when no backend succeeded. A successful
    /// chain with nothing found yields an empty list.
    pub async fn aggregate(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, ResearchError> {
        let timestamp = Utc::now();
        let mut seen: HashSet<String> = HashSet::new();
        let mut hits: Vec<SearchHit> = Vec::new();
        let mut failures: Vec<BackendFailure> = Vec::new();
        let mut any_succeeded = false;

        for backend in &self.backends {
            let name = backend.name().to_string();
            debug!("Querying search backend {}", name);

            let raw_hits = match self.call_backend(backend.as_ref(), query, max_results).await {
                Ok(raw_hits) => raw_hits,
                Err(e) => {
                    let unavailable = ResearchError::BackendUnavailable {
                        backend: name.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}, falling back", unavailable);
                    if let Some(metrics) = &self.metrics {
                        metrics.record_backend_failure();
                    }
                    failures.push(BackendFailure {
                        backend: name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            any_succeeded = true;

            let before = hits.len();
            for raw in raw_hits {
                let Some(key) = normalize_url(&raw.url) else {
                    debug!("Dropping hit with unusable URL: {:?}", raw.url);
                    continue;
                };
                if seen.insert(key) {
                    hits.push(enrich(raw, &name, timestamp));
                }
            }
            debug!(
                "Backend {} contributed {} new hits ({} total)",
                name,
                hits.len() - before,
                hits.len()
            );

            if hits.len() >= self.min_results {
                break;
            }
        }

        if !any_succeeded {
            return Err(ResearchError::AllBackendsFailed(failures));
        }

        hits.truncate(max_results);
        info!("Aggregated {} hits for query {:?}", hits.len(), query);
        Ok(hits)
    }
}

pub(crate) fn enrich(raw: RawHit, source_tag: &str, timestamp: chrono::DateTime<Utc>) -> SearchHit {
    let body = raw.body().to_string();
    SearchHit {
        sentiment: analyze_sentiment(&body),
        insights: extract_insights(&body),
        url: raw.url,
        title: raw.title,
        content: raw.content,
        snippet: raw.snippet,
        source_tag: source_tag.to_string(),
        timestamp,
        metadata: raw.metadata,
    }
}
