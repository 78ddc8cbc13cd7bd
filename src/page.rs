//! Page context: one document with its locator, engine and selector state.
//!
//! A context lives as long as the page it was built for. Hosts rebuild it when
//! the page navigates, which drops the strategy cache and nesting counters.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::dom::{Clipboard, DocumentRef};
use crate::error::AppError;
use crate::insertion::{EngineConfig, InsertionEngine, StrategyKind};
use crate::locator::{InputLocator, InputTarget};
use crate::models::VariableSpec;
use crate::selector::PromptSelector;

/// A selector open over a remembered target.
pub struct OpenSelector {
    pub selector: PromptSelector,
    pub target: InputTarget,
}

/// A variable form as shown, kept until its values are submitted.
#[derive(Clone)]
pub struct OpenForm {
    pub prompt_id: String,
    pub content: String,
    pub fields: Vec<VariableSpec>,
    pub target: Option<InputTarget>,
}

pub struct PageContext {
    document: DocumentRef,
    locator: InputLocator,
    engine: InsertionEngine,
    session: String,
    selector: Mutex<Option<OpenSelector>>,
    form: Mutex<Option<OpenForm>>,
}

impl PageContext {
    pub async fn attach(
        document: DocumentRef,
        clipboard: Arc<dyn Clipboard>,
        config: EngineConfig,
        session: impl Into<String>,
    ) -> Self {
        let engine = InsertionEngine::attach(Arc::clone(&document), clipboard, config).await;
        Self::with_engine(document, engine, session)
    }

    pub fn with_engine(document: DocumentRef, engine: InsertionEngine, session: impl Into<String>) -> Self {
        Self {
            document,
            locator: InputLocator::new(),
            engine,
            session: session.into(),
            selector: Mutex::new(None),
            form: Mutex::new(None),
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn engine(&self) -> &InsertionEngine {
        &self.engine
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub async fn locate(&self) -> Option<InputTarget> {
        self.locator.locate(self.document.as_ref()).await
    }

    /// Locate a target and insert `text` into it.
    pub async fn insert_text(&self, text: &str) -> Result<StrategyKind, AppError> {
        let target = self.locate().await.ok_or(AppError::NoTargetFound)?;
        self.insert_into(&target, text).await
    }

    pub async fn insert_into(&self, target: &InputTarget, text: &str) -> Result<StrategyKind, AppError> {
        self.engine
            .insert_with_report(target.element.as_ref(), text)
            .await
            .ok_or(AppError::InsertionFailed)
    }

    /// Current selection text, trimmed
    pub async fn selection_text(&self) -> Result<String, AppError> {
        let text = self
            .document
            .selection_text()
            .await
            .map_err(|e| AppError::BrowserError(e.to_string()))?;
        Ok(text.trim().to_string())
    }

    pub async fn location(&self) -> String {
        self.document.location().await.unwrap_or_default()
    }

    pub async fn open_selector(&self, selector: PromptSelector, target: InputTarget) {
        *self.selector.lock().await = Some(OpenSelector { selector, target });
    }

    pub async fn close_selector(&self) -> Option<OpenSelector> {
        self.selector.lock().await.take()
    }

    /// Run `f` against the open selector, `None` when no selector is open
    pub async fn with_selector<R>(&self, f: impl FnOnce(&mut PromptSelector) -> R) -> Option<R> {
        let mut guard = self.selector.lock().await;
        guard.as_mut().map(|open| f(&mut open.selector))
    }

    pub async fn open_form(&self, form: OpenForm) {
        *self.form.lock().await = Some(form);
    }

    /// The open form for `prompt_id`, left open
    pub async fn form_for(&self, prompt_id: &str) -> Option<OpenForm> {
        self.form
            .lock()
            .await
            .as_ref()
            .filter(|form| form.prompt_id == prompt_id)
            .cloned()
    }

    pub async fn close_form(&self) -> Option<OpenForm> {
        self.form.lock().await.take()
    }
}

/// Supplies the page context for the current page.
#[async_trait]
pub trait PageHost: Send + Sync {
    /// Make sure the page is ready for insertion and return its context
    async fn ensure_context(&self) -> Result<Arc<PageContext>, AppError>;

    fn is_attached(&self) -> bool;
}

/// Host over a fixed context, such as an in-memory document.
pub struct StaticPageHost {
    context: Arc<PageContext>,
}

impl StaticPageHost {
    pub fn new(context: Arc<PageContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl PageHost for StaticPageHost {
    async fn ensure_context(&self) -> Result<Arc<PageContext>, AppError> {
        Ok(Arc::clone(&self.context))
    }

    fn is_attached(&self) -> bool {
        true
    }
}
