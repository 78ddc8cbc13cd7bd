use anyhow::{anyhow, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::dom::cdp;

/// Manages browser lifecycle and the page the engine works on
pub struct BrowserManager {
    browser: Arc<Mutex<Option<Browser>>>,
    page: Arc<Mutex<Option<Page>>>,
    /// Serializes launches so only one Chrome instance is started
    launch_lock: Mutex<()>,
}

impl BrowserManager {
    pub fn new() -> Self {
        Self {
            browser: Arc::new(Mutex::new(None)),
            page: Arc::new(Mutex::new(None)),
            launch_lock: Mutex::new(()),
        }
    }

    /// Launch browser and navigate to URL
    pub async fn launch(&self, url: &str, headless: bool) -> Result<()> {
        let _launch_guard = self.launch_lock.lock().await;

        // Close any existing browser first
        self.close().await.ok();

        let mut config = BrowserConfig::builder().window_size(1280, 800);
        if !headless {
            config = config.with_head();
        }
        let config = config
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-default-apps")
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {}", e))?;

        let (mut browser, mut handler) = timeout(Duration::from_secs(30), Browser::launch(config))
            .await
            .map_err(|_| anyhow!("Browser launch timeout (30s) - Chrome may not be installed or is unresponsive"))?
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                tracing::trace!("Browser event: {:?}", event);
            }
        });

        let default_pages = browser
            .pages()
            .await
            .map_err(|e| anyhow!("Failed to get pages: {}", e))?;

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| anyhow!("Failed to create page: {}", e))?;

        for default_page in default_pages {
            if let Err(e) = default_page.close().await {
                tracing::warn!("Failed to close default page: {}", e);
            }
        }

        *self.browser.lock().await = Some(browser);
        *self.page.lock().await = Some(page);

        tracing::info!("Browser launched and navigated to {}", url);
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.page.lock().await.is_some()
    }

    /// Navigate to a URL
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.current_page().await?;
        page.goto(url)
            .await
            .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))?;
        Ok(())
    }

    /// Execute JavaScript and return result
    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let page = self.current_page().await?;
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| anyhow!("Failed to evaluate script: {}", e))?;

        result
            .into_value()
            .map_err(|e| anyhow!("Failed to parse script result: {}", e))
    }

    /// Make sure the page bridge is installed and return its session token.
    ///
    /// Pings first; when the bridge is missing it is injected, given `settle`
    /// to initialise and pinged again.
    pub async fn ensure_bridge(&self, settle: Duration) -> Result<String> {
        let page = self.current_page().await?;

        match cdp::bridge_session(&page).await {
            Ok(Some(session)) => return Ok(session),
            Ok(None) => tracing::debug!("Page bridge missing, injecting"),
            Err(e) => tracing::debug!("Page bridge ping failed, injecting: {}", e),
        }

        cdp::install_bridge(&page)
            .await
            .map_err(|e| anyhow!("Failed to inject page bridge: {}", e))?;
        tokio::time::sleep(settle).await;

        cdp::bridge_session(&page)
            .await
            .map_err(|e| anyhow!("Page bridge did not respond: {}", e))?
            .ok_or_else(|| anyhow!("Page bridge did not initialise"))
    }

    /// Close the browser
    pub async fn close(&self) -> Result<()> {
        let mut page_guard = self.page.lock().await;
        let mut browser_guard = self.browser.lock().await;

        if let Some(page) = page_guard.take() {
            let _ = page.close().await;
        }

        if let Some(mut browser) = browser_guard.take() {
            let _ = browser.close().await;
        }

        tracing::info!("Browser closed");
        Ok(())
    }

    /// Get the underlying page for advanced operations
    pub async fn page(&self) -> Option<Page> {
        self.page.lock().await.clone()
    }

    async fn current_page(&self) -> Result<Page> {
        self.page()
            .await
            .ok_or_else(|| anyhow!("No page available"))
    }
}

impl Default for BrowserManager {
    fn default() -> Self {
        Self::new()
    }
}
