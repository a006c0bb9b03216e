//! Chain-of-thought analysis of a single web page

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::error::ResearchError;
use crate::models::hit::truncate_with_ellipsis;
use crate::models::{Analysis, PageAnalysis, RawHit, SearchHit, Sentiment};
use crate::search::{BackendError, PageFetcher, normalize_url};
use crate::services::aggregator::enrich;
use crate::services::analyzer::HypothesisAnalyzer;

const SNIPPET_CHARS: usize = 200;

/// Fetches one page and runs the hypothesis analysis over its text
pub struct PageAnalyzer {
    fetcher: Arc<dyn PageFetcher>,
    analyzer: Arc<HypothesisAnalyzer>,
    fetch_timeout: Duration,
}

impl PageAnalyzer {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        analyzer: Arc<HypothesisAnalyzer>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            analyzer,
            fetch_timeout,
        }
    }

    /// Analyzes the page at `url`.
    ///
    /// Only a malformed URL is an error. Fetch failures come back as an
    /// error-tagged `PageAnalysis` with a degraded analysis.
    pub async fn analyze_url(&self, url: &str, depth: u8) -> Result<PageAnalysis, ResearchError> {
        let url = url.trim();
        if normalize_url(url).is_none() {
            return Err(ResearchError::InvalidRequest(format!(
                "not an http(s) URL: {url:?}"
            )));
        }

        let page = match self.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                let message = format!("Webpage analysis failed: {e}");
                error!("{}", message);
                return Ok(error_result(url, &message));
            }
        };

        let title = if page.title.is_empty() {
            "No title".to_string()
        } else {
            page.title
        };
        let raw = RawHit::new(&title, url, &page.text)
            .with_snippet(&truncate_with_ellipsis(&page.text, SNIPPET_CHARS))
            .with_metadata("description", page.description);
        let hit = enrich(raw, "web", Utc::now());

        let analysis = self
            .analyzer
            .analyze(url, std::slice::from_ref(&hit), depth)
            .await;
        info!(
            "Analyzed page {} ({} chars, degraded: {})",
            url,
            hit.content.chars().count(),
            analysis.degraded
        );

        Ok(PageAnalysis {
            page: hit,
            analysis,
            error: None,
        })
    }

    async fn fetch(&self, url: &str) -> Result<crate::search::html::PageContent, BackendError> {
        tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| BackendError::Timeout(self.fetch_timeout))?
    }
}

fn error_result(url: &str, message: &str) -> PageAnalysis {
    let page = SearchHit {
        url: url.to_string(),
        title: format!("Error analyzing {url}"),
        content: message.to_string(),
        snippet: message.to_string(),
        source_tag: "error".to_string(),
        timestamp: Utc::now(),
        sentiment: Sentiment::Neutral,
        insights: Vec::new(),
        metadata: Default::default(),
    };
    PageAnalysis {
        page,
        analysis: Analysis::unavailable(url, message),
        error: Some(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionOptions, MockTextCompletion};
    use crate::search::HttpPageFetcher;
    use crate::search::html::{MAX_PAGE_CHARS, PageContent};
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn analyzer(reply: &'static str, expected_calls: usize) -> Arc<HypothesisAnalyzer> {
        let mut completion = MockTextCompletion::new();
        completion
            .expect_complete()
            .times(expected_calls)
            .returning(move |_, _| Ok(reply.to_string()));
        Arc::new(HypothesisAnalyzer::new(
            Arc::new(completion),
            CompletionOptions::default(),
            Duration::from_secs(1),
        ))
    }

    struct StallingFetcher;

    #[async_trait]
    impl PageFetcher for StallingFetcher {
        async fn fetch(&self, _url: &str) -> Result<PageContent, BackendError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(PageContent::default())
        }
    }

    #[tokio::test]
    async fn test_analyze_url_extracts_text_and_analyzes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><title>Willow</title>
                <meta name="description" content="Chip news"></head>
                <body><nav>menu</nav><h1>Willow chip</h1>
                <p>Google reports below-threshold error correction.</p></body></html>"#,
            ))
            .mount(&server)
            .await;

        let pages = PageAnalyzer::new(
            Arc::new(HttpPageFetcher::default()),
            analyzer("## Summary\nError correction works.\n", 1),
            Duration::from_secs(5),
        );
        let url = format!("{}/post", server.uri());
        let result = pages.analyze_url(&url, 2).await.unwrap();

        assert!(!result.is_error());
        assert_eq!(result.page.title, "Willow");
        assert_eq!(result.page.source_tag, "web");
        assert_eq!(
            result.page.content,
            "Willow chip\nGoogle reports below-threshold error correction."
        );
        assert!(!result.page.content.contains("menu"));
        assert_eq!(result.page.metadata["description"], "Chip news");
        assert_eq!(result.analysis.summary, "Error correction works.");
        assert!(!result.analysis.degraded);
    }

    #[tokio::test]
    async fn test_long_page_text_is_capped() {
        let server = MockServer::start().await;
        let body = format!("<html><body><p>{}</p></body></html>", "a".repeat(MAX_PAGE_CHARS + 500));
        Mock::given(method("GET"))
            .and(path("/long"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let pages = PageAnalyzer::new(
            Arc::new(HttpPageFetcher::default()),
            analyzer("## Summary\nLong.\n", 1),
            Duration::from_secs(5),
        );
        let result = pages
            .analyze_url(&format!("{}/long", server.uri()), 1)
            .await
            .unwrap();

        assert_eq!(result.page.title, "No title");
        assert_eq!(result.page.content.chars().count(), MAX_PAGE_CHARS + 3);
        assert!(result.page.content.ends_with("..."));
        assert_eq!(result.page.snippet.chars().count(), SNIPPET_CHARS + 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_returns_error_tagged_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;

        let pages = PageAnalyzer::new(
            Arc::new(HttpPageFetcher::default()),
            analyzer("unused", 0),
            Duration::from_secs(5),
        );
        let url = format!("{}/missing", server.uri());
        let result = pages.analyze_url(&url, 2).await.unwrap();

        assert!(result.is_error());
        assert_eq!(result.page.source_tag, "error");
        assert_eq!(result.page.title, format!("Error analyzing {url}"));
        assert!(result.page.content.starts_with("Webpage analysis failed"));
        assert!(result.error.unwrap().contains("404"));
        assert!(result.analysis.degraded);
    }

    #[tokio::test]
    async fn test_stalled_fetch_times_out() {
        let pages = PageAnalyzer::new(
            Arc::new(StallingFetcher),
            analyzer("unused", 0),
            Duration::from_millis(50),
        );

        let result = pages
            .analyze_url("https://slow.example/page", 2)
            .await
            .unwrap();

        assert!(result.is_error());
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_malformed_url_is_rejected() {
        let pages = PageAnalyzer::new(
            Arc::new(StallingFetcher),
            analyzer("unused", 0),
            Duration::from_secs(1),
        );

        for url in ["", "not a url", "ftp://files.example/x"] {
            let err = pages.analyze_url(url, 2).await.unwrap_err();
            assert!(matches!(err, ResearchError::InvalidRequest(_)));
        }
    }
}
