#[cfg(test)]
mod research_handler_tests {
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::api::{app_state::AppState, create_app};
    use crate::config::GraphConfig;
    use crate::llm::{CompletionOptions, MockTextCompletion};
    use crate::models::RawHit;
    use crate::observability::{ObservabilityState, ResearchMetrics};
    use crate::search::html::PageContent;
    use crate::search::{BackendError, PageFetcher, SearchBackend};
    use crate::services::{
        HypothesisAnalyzer, PageAnalyzer, ResearchOrchestrator, ResultAggregator,
    };

    struct FixedBackend {
        hits: Option<Vec<RawHit>>,
    }

    #[async_trait]
    impl SearchBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<RawHit>, BackendError> {
            self.hits
                .clone()
                .ok_or_else(|| BackendError::Parse("offline".into()))
        }
    }

    struct FixedFetcher;

    #[async_trait]
    impl PageFetcher for FixedFetcher {
        async fn fetch(&self, url: &str) -> Result<PageContent, BackendError> {
            if url.ends_with("/missing") {
                return Err(BackendError::Status {
                    status: 404,
                    body: "gone".into(),
                });
            }
            Ok(PageContent {
                url: url.to_string(),
                title: "Willow".to_string(),
                text: "Google reports below-threshold error correction.".to_string(),
                ..PageContent::default()
            })
        }
    }

    fn app(hits: Option<Vec<RawHit>>) -> (Router, Arc<ResearchMetrics>) {
        let metrics = Arc::new(ResearchMetrics::new());
        let backend: Arc<dyn SearchBackend> = Arc::new(FixedBackend { hits });
        let aggregator = ResultAggregator::new(vec![backend], 3, Duration::from_secs(1));

        let mut completion = MockTextCompletion::new();
        completion
            .expect_complete()
            .returning(|_, _| Ok("## Summary\nQubits are getting better.\n".to_string()));
        let analyzer = Arc::new(HypothesisAnalyzer::new(
            Arc::new(completion),
            CompletionOptions::default(),
            Duration::from_secs(1),
        ));
        let page_analyzer =
            PageAnalyzer::new(Arc::new(FixedFetcher), analyzer.clone(), Duration::from_secs(1));

        let orchestrator =
            ResearchOrchestrator::new(Arc::new(aggregator), analyzer, GraphConfig::default())
                .with_metrics(metrics.clone());
        let state = AppState::new(
            Arc::new(orchestrator),
            Arc::new(page_analyzer),
            vec!["fixed".to_string()],
        );
        let observability = Arc::new(ObservabilityState::new("0.1.0", metrics.clone()));

        (create_app(state, observability), metrics)
    }

    fn research_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/research")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_research_returns_200_with_record() {
        let (app, metrics) = app(Some(vec![RawHit::new(
            "Qubits",
            "https://a.example/qubits",
            "Logical qubits improve.",
        )]));

        let response = app
            .oneshot(research_request(json!({"query": "quantum", "depth": 1})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["state"], "completed");
        assert_eq!(body["analysis"]["summary"], "Qubits are getting better.");
        assert_eq!(body["graph"], json!({"nodes": [], "edges": []}));
        assert_eq!(metrics.snapshot().http_requests_total, 1);
    }

    #[tokio::test]
    async fn test_research_returns_502_when_all_backends_fail() {
        let (app, _) = app(None);

        let response = app
            .oneshot(research_request(json!({"query": "quantum"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["state"], "failed");
        assert!(body["error"].as_str().unwrap().contains("offline"));
    }

    #[tokio::test]
    async fn test_blank_query_returns_400() {
        let (app, _) = app(Some(Vec::new()));

        let response = app
            .oneshot(research_request(json!({"query": "   "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    fn analyze_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/analyze-url")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_url_returns_200() {
        let (app, _) = app(Some(Vec::new()));

        let response = app
            .oneshot(analyze_request(json!({"url": "https://a.example/post"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["page"]["title"], "Willow");
        assert_eq!(body["page"]["source_tag"], "web");
        assert_eq!(body["analysis"]["summary"], "Qubits are getting better.");
        assert!(body["error"].is_null());
    }

    #[tokio::test]
    async fn test_analyze_url_fetch_failure_returns_502() {
        let (app, _) = app(Some(Vec::new()));

        let response = app
            .oneshot(analyze_request(json!({"url": "https://a.example/missing"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["page"]["source_tag"], "error");
        assert!(body["error"].as_str().unwrap().contains("404"));
        assert_eq!(body["analysis"]["degraded"], true);
    }

    #[tokio::test]
    async fn test_analyze_url_rejects_non_http_url() {
        let (app, _) = app(Some(Vec::new()));

        let response = app
            .oneshot(analyze_request(json!({"url": "file:///etc/passwd"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_list_backends() {
        let (app, _) = app(Some(Vec::new()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/backends")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"backends": ["fixed"]}));
    }

    #[tokio::test]
    async fn test_health_is_merged() {
        let (app, _) = app(Some(Vec::new()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
