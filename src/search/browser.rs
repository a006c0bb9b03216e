//! Headless-browser search backend with a pooled set of sessions

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::models::RawHit;
use crate::search::html::parse_result_page;
use crate::search::{BackendError, SearchBackend};

/// Hard cap on result pages walked per search
pub const MAX_RESULT_PAGES: usize = 10;

const RESULTS_PER_PAGE: usize = 10;

/// One live browser tab
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BackendError>;

    /// HTML of the current page
    async fn html(&mut self) -> Result<String, BackendError>;
}

/// Starts new browser sessions for the pool
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BackendError>;
}

type IdleSessions = Arc<Mutex<Vec<Box<dyn BrowserSession>>>>;

/// Bounded pool of long-lived browser sessions
///
/// Sessions are launched lazily. At most `size` sessions are checked out at once.
pub struct SessionPool {
    launcher: Arc<dyn BrowserLauncher>,
    idle: IdleSessions,
    permits: Arc<Semaphore>,
    size: usize,
}

impl SessionPool {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, size: usize) -> Self {
        let size = size.max(1);
        Self {
            launcher,
            idle: Arc::new(Mutex::new(Vec::new())),
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of sessions waiting in the pool
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Checks out a session, launching one if none is idle.
    pub async fn acquire(&self) -> Result<SessionGuard, BackendError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| BackendError::Browser(format!("session pool closed: {e}")))?;

        let idle = self.idle.lock().pop();
        let session = match idle {
            Some(session) => session,
            None => {
                debug!("Launching new browser session");
                self.launcher.launch().await?
            }
        };

        Ok(SessionGuard {
            session: Some(session),
            idle: Arc::clone(&self.idle),
            broken: true,
            _permit: permit,
        })
    }
}

/// Checked-out session
///
/// A guard starts out broken and only goes back to the pool once the holder
/// calls `mark_healthy`. A holder cancelled mid-navigation therefore drops a
/// session in an unknown state, which is discarded and the slot freed.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    idle: IdleSessions,
    broken: bool,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Lets the session return to the pool on drop
    pub fn mark_healthy(&mut self) {
        self.broken = false;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub async fn navigate(&mut self, url: &str) -> Result<(), BackendError> {
        match self.session.as_mut() {
            Some(session) => session.navigate(url).await,
            None => Err(BackendError::Browser("session already released".into())),
        }
    }

    pub async fn html(&mut self) -> Result<String, BackendError> {
        match self.session.as_mut() {
            Some(session) => session.html().await,
            None => Err(BackendError::Browser("session already released".into())),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if self.broken {
                debug!("Discarding broken browser session");
            } else {
                self.idle.lock().push(session);
            }
        }
    }
}

/// Per-session browser profile directory, removed when the session goes away
#[derive(Debug)]
pub struct ProfileDir {
    path: PathBuf,
}

impl ProfileDir {
    /// Fresh, not yet created directory under `root`
    pub fn unique_in(root: &Path) -> Self {
        Self {
            path: root.join(format!("deepdive-chrome-{}", uuid::Uuid::new_v4().simple())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Failed to remove browser profile {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Search backend rendering result pages in a pooled browser
pub struct PrimaryBrowserBackend {
    pool: Arc<SessionPool>,
    search_base_url: String,
    max_pages: usize,
}

impl PrimaryBrowserBackend {
    pub fn new(pool: Arc<SessionPool>, search_base_url: &str, max_pages: usize) -> Self {
        Self {
            pool,
            search_base_url: search_base_url.trim_end_matches('/').to_string(),
            max_pages: max_pages.clamp(1, MAX_RESULT_PAGES),
        }
    }

    fn page_url(&self, query: &str, page: usize) -> String {
        let encoded = urlencoding::encode(query);
        if page == 0 {
            format!("{}/search?q={}", self.search_base_url, encoded)
        } else {
            format!(
                "{}/search?q={}&first={}",
                self.search_base_url,
                encoded,
                page * RESULTS_PER_PAGE + 1
            )
        }
    }
}

#[async_trait]
impl SearchBackend for PrimaryBrowserBackend {
    fn name(&self) -> &str {
        "browser"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, BackendError> {
        let mut session = self.pool.acquire().await?;
        let mut hits = Vec::new();

        for page in 0..self.max_pages {
            if hits.len() >= max_results {
                break;
            }

            let url = self.page_url(query, page);
            let html = match session.navigate(&url).await {
                Ok(()) => session.html().await,
                Err(e) => Err(e),
            };
            let html = match html {
                Ok(html) => html,
                Err(e) => {
                    warn!("Browser session failed on {}: {}", url, e);
                    session.mark_broken();
                    return Err(e);
                }
            };

            let remaining = max_results - hits.len();
            let page_hits = parse_result_page(&html, "bing", remaining)?;
            if page_hits.is_empty() {
                break;
            }
            hits.extend(
                page_hits
                    .into_iter()
                    .map(|hit| hit.with_metadata("page", page + 1)),
            );
        }

        session.mark_healthy();
        debug!("Browser backend collected {} hits", hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn result_page(urls: &[&str]) -> String {
        let items: String = urls
            .iter()
            .map(|u| {
                format!(
                    r#"<li class="b_algo"><h2><a href="{u}">Title {u}</a></h2><div class="b_caption"><p>Snippet for {u}</p></div></li>"#
                )
            })
            .collect();
        format!(r#"<html><body><ol id="b_results">{items}</ol></body></html>"#)
    }

    struct ScriptedSession {
        pages: Arc<HashMap<String, String>>,
        current: Option<String>,
        fail: bool,
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn navigate(&mut self, url: &str) -> Result<(), BackendError> {
            if self.fail {
                return Err(BackendError::Browser("target crashed".into()));
            }
            if url.contains("stall") {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            }
            self.current = Some(url.to_string());
            Ok(())
        }

        async fn html(&mut self) -> Result<String, BackendError> {
            let current = self.current.clone().unwrap_or_default();
            Ok(self.pages.get(&current).cloned().unwrap_or_default())
        }
    }

    struct ScriptedLauncher {
        pages: Arc<HashMap<String, String>>,
        launches: AtomicUsize,
        fail: bool,
    }

    impl ScriptedLauncher {
        fn new(pages: HashMap<String, String>, fail: bool) -> Self {
            Self {
                pages: Arc::new(pages),
                launches: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl BrowserLauncher for ScriptedLauncher {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>, BackendError> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSession {
                pages: Arc::clone(&self.pages),
                current: None,
                fail: self.fail,
            }))
        }
    }

    #[tokio::test]
    async fn test_guard_returns_session_to_pool() {
        let launcher = Arc::new(ScriptedLauncher::new(HashMap::new(), false));
        let pool = SessionPool::new(launcher.clone(), 2);

        {
            let mut guard = pool.acquire().await.unwrap();
            assert_eq!(pool.idle_count(), 0);
            guard.mark_healthy();
        }
        assert_eq!(pool.idle_count(), 1);

        let _guard = pool.acquire().await.unwrap();
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_broken_session_is_discarded() {
        let launcher = Arc::new(ScriptedLauncher::new(HashMap::new(), false));
        let pool = SessionPool::new(launcher.clone(), 1);

        {
            let mut guard = pool.acquire().await.unwrap();
            guard.mark_healthy();
            guard.mark_broken();
        }
        assert_eq!(pool.idle_count(), 0);

        // the slot was freed, so a fresh session can be launched
        let _guard = pool.acquire().await.unwrap();
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_session_discarded_when_holder_is_cancelled() {
        let launcher = Arc::new(ScriptedLauncher::new(HashMap::new(), false));
        let pool = Arc::new(SessionPool::new(launcher.clone(), 1));

        let task_pool = Arc::clone(&pool);
        let handle = tokio::spawn(async move {
            let _guard = task_pool.acquire().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        handle.abort();
        let _ = handle.await;

        assert_eq!(pool.idle_count(), 0);
        // the slot is free again
        let _guard = pool.acquire().await.unwrap();
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_search_timed_out_mid_navigation_discards_session() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://www.bing.com/search?q=qubits".to_string(),
            result_page(&["https://a.example/1"]),
        );
        let launcher = Arc::new(ScriptedLauncher::new(pages, false));
        let pool = Arc::new(SessionPool::new(launcher.clone(), 1));
        let backend = PrimaryBrowserBackend::new(Arc::clone(&pool), "https://www.bing.com", 1);

        let stalled = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            backend.search("stall", 5),
        )
        .await;
        assert!(stalled.is_err());
        assert_eq!(pool.idle_count(), 0);

        let hits = backend.search("qubits", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
        // a completed search hands its session back
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_browser_backend_paginates() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://www.bing.com/search?q=quantum%20computing".to_string(),
            result_page(&["https://a.example/1", "https://a.example/2"]),
        );
        pages.insert(
            "https://www.bing.com/search?q=quantum%20computing&first=11".to_string(),
            result_page(&["https://b.example/3"]),
        );
        let launcher = Arc::new(ScriptedLauncher::new(pages, false));
        let pool = Arc::new(SessionPool::new(launcher, 1));
        let backend = PrimaryBrowserBackend::new(pool, "https://www.bing.com/", 3);

        let hits = backend.search("quantum computing", 10).await.unwrap();

        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.example/1", "https://a.example/2", "https://b.example/3"]
        );
        assert_eq!(hits[2].metadata["page"], 2);
    }

    #[test]
    fn test_profile_dir_removed_on_drop() {
        let root = tempfile::TempDir::new().unwrap();
        let profile = ProfileDir::unique_in(root.path());
        let path = profile.path().to_path_buf();
        std::fs::create_dir_all(path.join("Default")).unwrap();
        std::fs::write(path.join("Default/Cookies"), b"x").unwrap();

        drop(profile);
        assert!(!path.exists());

        // never created: dropping is a no-op
        drop(ProfileDir::unique_in(root.path()));
    }

    #[tokio::test]
    async fn test_browser_backend_failure_discards_session() {
        let launcher = Arc::new(ScriptedLauncher::new(HashMap::new(), true));
        let pool = Arc::new(SessionPool::new(launcher, 1));
        let backend = PrimaryBrowserBackend::new(Arc::clone(&pool), "https://www.bing.com", 1);

        let err = backend.search("anything", 5).await.unwrap_err();
        assert!(matches!(err, BackendError::Browser(_)));
        assert_eq!(pool.idle_count(), 0);
    }
}
