use crate::services::{PageAnalyzer, ResearchOrchestrator};
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for a single research request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Research run sequencer
    pub orchestrator: Arc<ResearchOrchestrator>,
    /// Single-page analysis
    pub page_analyzer: Arc<PageAnalyzer>,
    /// Search backend names in priority order
    pub backend_names: Arc<Vec<String>>,
    /// Upper bound for one research or page analysis request
    pub request_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("orchestrator", &"Arc<ResearchOrchestrator>")
            .field("page_analyzer", &"Arc<PageAnalyzer>")
            .field("backend_names", &self.backend_names)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        orchestrator: Arc<ResearchOrchestrator>,
        page_analyzer: Arc<PageAnalyzer>,
        backend_names: Vec<String>,
    ) -> Self {
        Self {
            orchestrator,
            page_analyzer,
            backend_names: Arc::new(backend_names),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
