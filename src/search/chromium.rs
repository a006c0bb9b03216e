//! Chromium-backed browser sessions over CDP

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures_util::StreamExt;
use tracing::debug;

use crate::config::BrowserConfig;
use crate::search::BackendError;
use crate::search::browser::{BrowserLauncher, BrowserSession, ProfileDir};

/// Launches one Chromium process per pooled session
pub struct ChromiumLauncher {
    config: BrowserConfig,
    user_agent: String,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig, user_agent: &str) -> Self {
        Self {
            config,
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BackendError> {
        let mut builder = chromiumoxide::BrowserConfig::builder();
        if let Some(path) = &self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if !self.config.headless {
            builder = builder.with_head();
        }

        let profile = ProfileDir::unique_in(&std::env::temp_dir());
        builder = builder
            .user_data_dir(profile.path())
            .arg(format!("--user-agent={}", self.user_agent))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg("--disable-dev-shm-usage");

        let browser_config = builder
            .build()
            .map_err(|e| BackendError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BackendError::Browser(format!("failed to launch Chrome: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BackendError::Browser(format!("failed to create page: {e}")))?;

        debug!("Chromium session launched");
        Ok(Box::new(ChromiumSession {
            _browser: browser,
            page,
            handler: handler_task,
            _profile: profile,
        }))
    }
}

/// One Chromium process with a single tab
///
/// Fields drop in order, so the profile directory is removed after the
/// browser process is gone.
pub struct ChromiumSession {
    _browser: Browser,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
    _profile: ProfileDir,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BackendError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BackendError::Browser(format!("navigation failed: {e}")))?;
        Ok(())
    }

    async fn html(&mut self) -> Result<String, BackendError> {
        self.page
            .content()
            .await
            .map_err(|e| BackendError::Browser(format!("failed to read page content: {e}")))
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
