use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::manager::BrowserManager;
use crate::dom::cdp::CdpDocument;
use crate::dom::Clipboard;
use crate::error::AppError;
use crate::insertion::EngineConfig;
use crate::page::{PageContext, PageHost};

/// Page host backed by the managed Chromium page.
///
/// The context is rebuilt whenever the page bridge reports a new session,
/// i.e. after every navigation or reload.
pub struct CdpPageHost {
    browser: Arc<BrowserManager>,
    clipboard: Arc<dyn Clipboard>,
    engine_config: EngineConfig,
    settle: Duration,
    context: Mutex<Option<Arc<PageContext>>>,
    attached: AtomicBool,
}

impl CdpPageHost {
    pub fn new(
        browser: Arc<BrowserManager>,
        clipboard: Arc<dyn Clipboard>,
        engine_config: EngineConfig,
        settle: Duration,
    ) -> Self {
        Self {
            browser,
            clipboard,
            engine_config,
            settle,
            context: Mutex::new(None),
            attached: AtomicBool::new(false),
        }
    }

    pub fn browser(&self) -> &Arc<BrowserManager> {
        &self.browser
    }

    /// Drop the current context, e.g. after the browser was relaunched
    pub async fn reset(&self) {
        *self.context.lock().await = None;
        self.attached.store(false, Ordering::Relaxed);
    }
}

#[async_trait]
impl PageHost for CdpPageHost {
    async fn ensure_context(&self) -> Result<Arc<PageContext>, AppError> {
        let session = match self.browser.ensure_bridge(self.settle).await {
            Ok(session) => session,
            Err(e) => {
                self.attached.store(false, Ordering::Relaxed);
                return Err(AppError::BrowserError(e.to_string()));
            }
        };

        let mut current = self.context.lock().await;
        if let Some(context) = current.as_ref() {
            if context.session() == session {
                return Ok(Arc::clone(context));
            }
            tracing::info!("Page session changed, rebuilding page context");
        }

        let page = self
            .browser
            .page()
            .await
            .ok_or_else(|| AppError::BrowserError("No page available".to_string()))?;
        let context = Arc::new(
            PageContext::attach(
                CdpDocument::top(page),
                Arc::clone(&self.clipboard),
                self.engine_config.clone(),
                session,
            )
            .await,
        );
        *current = Some(Arc::clone(&context));
        self.attached.store(true, Ordering::Relaxed);
        Ok(context)
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Relaxed)
    }
}
