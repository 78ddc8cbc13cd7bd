//! Insertion Engine: writes text into a target so the host page sees it as user input.
//!
//! Strategies are tried in a per-site order (or a default order derived from
//! the page's [`EnvironmentProfile`]). Every attempt is verified by looking for
//! the start of the text in the element afterwards, and the verified winner is
//! remembered per hostname so the next insertion tries it first.

pub mod cache;
pub mod environment;
pub mod guard;
pub mod strategies;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::dom::{Clipboard, DocumentRef, DomResult, Element};
use crate::locator::InsertMode;

pub use cache::SiteStrategyCache;
pub use environment::{EnvironmentProfile, Framework};
pub use guard::NestingCounter;
pub use strategies::{
    ClipboardPasteStrategy, ComponentWriteStrategy, InsertStrategy, NativeSetterStrategy,
    ObserverBypassStrategy, SimulatedTypingStrategy, StandardStrategy, StrategyKind,
};

pub const DEFAULT_MAX_NESTING: usize = 5;
pub const DEFAULT_VERIFY_PREFIX: usize = 20;
pub const DEFAULT_TYPING_DELAY_MS: u64 = 5;
pub const DEFAULT_CLIPBOARD_RESTORE_MS: u64 = 100;

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_nesting: usize,
    /// Characters of the inserted text that must show up in the element
    pub verify_prefix: usize,
    pub typing_delay: Duration,
    pub clipboard_restore_delay: Duration,
    /// Strategy order per hostname; other hosts use the profile default
    pub site_orders: HashMap<String, Vec<StrategyKind>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        use StrategyKind::*;

        let chatgpt = vec![NativeSetter, SimulatedTyping, Standard];
        let notion = vec![SimulatedTyping, ClipboardPaste, Standard];
        let site_orders = [
            ("chat.openai.com", chatgpt.clone()),
            ("chatgpt.com", chatgpt),
            ("claude.ai", vec![NativeSetter, SimulatedTyping, ClipboardPaste]),
            ("gemini.google.com", vec![NativeSetter, ClipboardPaste, Standard]),
            ("notion.so", notion.clone()),
            ("www.notion.so", notion),
            ("github.com", vec![Standard, SimulatedTyping]),
            ("docs.google.com", vec![SimulatedTyping, ClipboardPaste]),
        ]
        .into_iter()
        .map(|(host, order)| (host.to_string(), order))
        .collect();

        Self {
            max_nesting: DEFAULT_MAX_NESTING,
            verify_prefix: DEFAULT_VERIFY_PREFIX,
            typing_delay: Duration::from_millis(DEFAULT_TYPING_DELAY_MS),
            clipboard_restore_delay: Duration::from_millis(DEFAULT_CLIPBOARD_RESTORE_MS),
            site_orders,
        }
    }
}

impl EngineConfig {
    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    pub fn with_clipboard_restore_delay(mut self, delay: Duration) -> Self {
        self.clipboard_restore_delay = delay;
        self
    }

    pub fn with_site_order(mut self, hostname: &str, order: Vec<StrategyKind>) -> Self {
        self.site_orders.insert(hostname.to_string(), order);
        self
    }
}

/// One engine per page context.
pub struct InsertionEngine {
    document: DocumentRef,
    profile: EnvironmentProfile,
    config: EngineConfig,
    strategies: HashMap<StrategyKind, Arc<dyn InsertStrategy>>,
    cache: SiteStrategyCache,
    nesting: NestingCounter,
}

impl InsertionEngine {
    /// Probe the page environment once and build the default strategies.
    pub async fn attach(
        document: DocumentRef,
        clipboard: Arc<dyn Clipboard>,
        config: EngineConfig,
    ) -> Self {
        let profile = match document.environment().await {
            Ok(markers) => EnvironmentProfile::from_markers(&markers),
            Err(e) => {
                tracing::debug!("Environment probe failed, assuming a plain page: {}", e);
                EnvironmentProfile::plain()
            }
        };
        tracing::debug!("Insertion engine attached with profile {:?}", profile);
        Self::with_profile(document, clipboard, config, profile)
    }

    pub fn with_profile(
        document: DocumentRef,
        clipboard: Arc<dyn Clipboard>,
        config: EngineConfig,
        profile: EnvironmentProfile,
    ) -> Self {
        let typing = SimulatedTypingStrategy::new(config.typing_delay);
        let paste = ClipboardPasteStrategy::new(
            clipboard,
            profile.clipboard_access,
            config.clipboard_restore_delay,
        );
        let mut engine = Self {
            document,
            profile,
            config,
            strategies: HashMap::new(),
            cache: SiteStrategyCache::new(),
            nesting: NestingCounter::new(),
        };
        engine.register_strategy(Arc::new(StandardStrategy));
        engine.register_strategy(Arc::new(NativeSetterStrategy));
        engine.register_strategy(Arc::new(ComponentWriteStrategy));
        engine.register_strategy(Arc::new(typing));
        engine.register_strategy(Arc::new(paste));
        engine.register_strategy(Arc::new(ObserverBypassStrategy));
        engine
    }

    /// Register a strategy, replacing any registered under the same kind.
    pub fn register_strategy(&mut self, strategy: Arc<dyn InsertStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    pub fn profile(&self) -> EnvironmentProfile {
        self.profile
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cached_strategy(&self, hostname: &str) -> Option<StrategyKind> {
        self.cache.get(hostname)
    }

    pub fn nesting_depth(&self, element: &dyn Element) -> usize {
        self.nesting.depth(element.id())
    }

    /// Cascade order for `hostname`.
    pub fn strategies_for_site(&self, hostname: &str) -> Vec<StrategyKind> {
        if let Some(order) = self.config.site_orders.get(hostname) {
            return order.clone();
        }

        let mut order = vec![StrategyKind::Standard];
        match self.profile.framework {
            Framework::React => order.push(StrategyKind::NativeSetter),
            Framework::Vue => order.push(StrategyKind::ComponentWrite),
            Framework::Angular | Framework::Plain => {}
        }
        order.push(StrategyKind::SimulatedTyping);
        if self.profile.clipboard_access {
            order.push(StrategyKind::ClipboardPaste);
        }
        order.push(StrategyKind::ObserverBypass);
        order
    }

    /// Insert `text` into `element`; `false` when every strategy failed.
    pub async fn insert(&self, element: &dyn Element, text: &str) -> bool {
        self.insert_with_report(element, text).await.is_some()
    }

    /// Like [`insert`](Self::insert), returning the strategy that succeeded.
    pub async fn insert_with_report(&self, element: &dyn Element, text: &str) -> Option<StrategyKind> {
        if text.is_empty() {
            tracing::debug!("Nothing to insert");
            return None;
        }

        let Some(_guard) = self.nesting.enter(element.id(), self.config.max_nesting) else {
            tracing::warn!(
                "Insertion into {} refused: already {} levels deep",
                element.id(),
                self.config.max_nesting
            );
            return None;
        };

        let mode = match InsertMode::of(element).await {
            Ok(mode) => mode,
            Err(e) => {
                tracing::debug!("Cannot classify {}: {}", element.id(), e);
                return None;
            }
        };
        let hostname = self.document.hostname().await.unwrap_or_default();
        let before = read_current(element, mode).await.unwrap_or_default();

        let cached = self.cache.get(&hostname);
        if let Some(kind) = cached {
            if self.attempt(kind, element, mode, text, &before).await {
                tracing::info!("Inserted into {} on {} via cached {}", element.id(), hostname, kind);
                return Some(kind);
            }
            tracing::debug!("Cached strategy {} failed on {}, running cascade", kind, hostname);
        }

        for kind in self.strategies_for_site(&hostname) {
            if Some(kind) == cached {
                continue;
            }
            if self.attempt(kind, element, mode, text, &before).await {
                self.cache.remember(&hostname, kind);
                tracing::info!("Inserted into {} on {} via {}", element.id(), hostname, kind);
                return Some(kind);
            }
        }

        tracing::warn!("All insertion strategies failed for {} on {}", element.id(), hostname);
        None
    }

    async fn attempt(
        &self,
        kind: StrategyKind,
        element: &dyn Element,
        mode: InsertMode,
        text: &str,
        before: &str,
    ) -> bool {
        let Some(strategy) = self.strategies.get(&kind) else {
            tracing::debug!("No strategy registered for {}", kind);
            return false;
        };
        tracing::debug!("Trying {} on {}", kind, element.id());
        if !strategy.try_apply(element, mode, text).await {
            return false;
        }
        match self.verify(element, mode, text, before).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!("{} did not take effect on {}", kind, element.id());
                false
            }
            Err(e) => {
                tracing::debug!("Verification after {} failed: {}", kind, e);
                false
            }
        }
    }

    /// The prefix must be present, and an unchanged target only counts when it
    /// already held exactly `text`.
    async fn verify(&self, element: &dyn Element, mode: InsertMode, text: &str, before: &str) -> DomResult<bool> {
        let prefix: String = text.chars().take(self.config.verify_prefix).collect();
        let current = read_current(element, mode).await?;
        Ok(current.contains(&prefix) && (current != before || current == text))
    }
}

async fn read_current(element: &dyn Element, mode: InsertMode) -> DomResult<String> {
    match mode {
        InsertMode::Value => element.value().await,
        InsertMode::Content => element.text_content().await,
    }
}
