//! Integration tests for the insertion engine against the in-memory document.
//!
//! Run with: cargo test --test insertion_engine

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use promptpal_sidecar::dom::memory::{FrameworkBehavior, MemoryDocument, MemoryElement};
use promptpal_sidecar::dom::{DomResult, Element, EnvironmentMarkers, MemoryClipboard};
use promptpal_sidecar::insertion::{
    EngineConfig, EnvironmentProfile, Framework, InsertStrategy, InsertionEngine, StrategyKind,
};
use promptpal_sidecar::locator::InsertMode;

fn fast_config() -> EngineConfig {
    EngineConfig::default()
        .with_typing_delay(Duration::ZERO)
        .with_clipboard_restore_delay(Duration::from_millis(10))
}

fn engine(doc: &Arc<MemoryDocument>, profile: EnvironmentProfile, config: EngineConfig) -> InsertionEngine {
    InsertionEngine::with_profile(
        Arc::clone(doc) as _,
        Arc::new(MemoryClipboard::new()),
        config,
        profile,
    )
}

fn textarea(doc: &MemoryDocument, behavior: FrameworkBehavior) -> Arc<MemoryElement> {
    let element = doc.append("textarea");
    element.set_behavior(behavior);
    element
}

// ============================================================================
// Cascade fallback
// ============================================================================

#[tokio::test]
async fn test_throwing_native_setter_falls_through() {
    let doc = MemoryDocument::new("https://chatgpt.com/c/1");
    let input = textarea(
        &doc,
        FrameworkBehavior {
            native_setter_throws: true,
            ..Default::default()
        },
    );
    let engine = engine(&doc, EnvironmentProfile::plain(), fast_config());
    assert_eq!(engine.strategies_for_site("chatgpt.com")[0], StrategyKind::NativeSetter);

    let used = engine
        .insert_with_report(input.as_ref(), "Summarize this article")
        .await;

    assert!(matches!(
        used,
        Some(StrategyKind::SimulatedTyping) | Some(StrategyKind::Standard)
    ));
    assert!(input.current_value().contains("Summarize this article"));
    assert_eq!(engine.cached_strategy("chatgpt.com"), used);
}

#[tokio::test]
async fn test_controlled_input_needs_native_setter() {
    let doc = MemoryDocument::new("https://example.com/form");
    let input = textarea(
        &doc,
        FrameworkBehavior {
            swallows_plain_assignment: true,
            ..Default::default()
        },
    );
    let engine = engine(
        &doc,
        EnvironmentProfile::plain().with_framework(Framework::React),
        fast_config(),
    );

    let used = engine.insert_with_report(input.as_ref(), "Hello there").await;

    assert_eq!(used, Some(StrategyKind::NativeSetter));
    assert_eq!(input.current_value(), "Hello there");
    assert!(input.event_names().ends_with(&["input", "change", "blur", "focus"]));
}

#[tokio::test]
async fn test_observer_bypass_is_last_resort() {
    let doc = MemoryDocument::new("https://example.com");
    let input = textarea(
        &doc,
        FrameworkBehavior {
            reverts_observed_mutations: true,
            ..Default::default()
        },
    );
    let engine = engine(&doc, EnvironmentProfile::plain(), fast_config());

    let used = engine.insert_with_report(input.as_ref(), "Draft a reply").await;

    assert_eq!(used, Some(StrategyKind::ObserverBypass));
    assert_eq!(input.current_value(), "Draft a reply");
    assert_eq!(doc.observer_suspensions(), 1);
    assert!(!doc.observers_suspended(), "observers must be restored");
}

#[tokio::test]
async fn test_every_strategy_failing_returns_false() {
    let doc = MemoryDocument::new("https://example.com");
    // Plain writes swallowed and the native setter throws: nothing can write
    let input = textarea(
        &doc,
        FrameworkBehavior {
            swallows_plain_assignment: true,
            native_setter_throws: true,
            ..Default::default()
        },
    );
    let engine = engine(&doc, EnvironmentProfile::plain(), fast_config());

    assert!(!engine.insert(input.as_ref(), "anything").await);
    assert_eq!(input.current_value(), "");
    assert!(engine.cached_strategy("example.com").is_none());
    assert_eq!(engine.nesting_depth(input.as_ref()), 0);
}

#[tokio::test]
async fn test_swallowed_write_over_matching_text_is_not_success() {
    let doc = MemoryDocument::new("https://example.com");
    let input = textarea(
        &doc,
        FrameworkBehavior {
            swallows_plain_assignment: true,
            ..Default::default()
        },
    );
    input.set_initial_value("Hello there, old draft");
    let engine = engine(
        &doc,
        EnvironmentProfile::plain(),
        fast_config().with_site_order("example.com", vec![StrategyKind::Standard]),
    );

    assert!(!engine.insert(input.as_ref(), "Hello there").await);
    assert_eq!(input.current_value(), "Hello there, old draft");
    assert!(engine.cached_strategy("example.com").is_none());
}

#[tokio::test]
async fn test_contenteditable_uses_content_path() {
    let doc = MemoryDocument::new("https://example.com");
    let editor = doc.append("div");
    editor.make_content_editable().set_initial_text("old draft");
    let engine = engine(&doc, EnvironmentProfile::plain(), fast_config());

    let used = engine
        .insert_with_report(editor.as_ref(), "A fresh prompt")
        .await;

    assert_eq!(used, Some(StrategyKind::Standard));
    assert_eq!(editor.current_text(), "A fresh prompt");
}

#[tokio::test]
async fn test_attach_reads_environment_once() {
    let doc = MemoryDocument::new("https://example.com");
    doc.set_environment(EnvironmentMarkers {
        vue: true,
        clipboard_access: true,
        ..Default::default()
    });

    let engine = InsertionEngine::attach(
        Arc::clone(&doc) as _,
        Arc::new(MemoryClipboard::new()),
        fast_config(),
    )
    .await;

    assert_eq!(engine.profile().framework, Framework::Vue);
    assert_eq!(
        engine.strategies_for_site("example.com"),
        vec![
            StrategyKind::Standard,
            StrategyKind::ComponentWrite,
            StrategyKind::SimulatedTyping,
            StrategyKind::ClipboardPaste,
            StrategyKind::ObserverBypass,
        ]
    );

    // Later marker changes do not alter the profile
    doc.set_environment(EnvironmentMarkers::default());
    assert_eq!(engine.profile().framework, Framework::Vue);
}

// ============================================================================
// Clipboard paste
// ============================================================================

#[tokio::test]
async fn test_clipboard_paste_restores_previous_text() {
    let doc = MemoryDocument::new("https://example.com");
    let clipboard = Arc::new(MemoryClipboard::with_text("user copied this"));
    doc.attach_clipboard(Arc::clone(&clipboard));
    let input = textarea(&doc, FrameworkBehavior::default());
    input.set_initial_value("replace me");

    let engine = InsertionEngine::with_profile(
        Arc::clone(&doc) as _,
        Arc::clone(&clipboard) as _,
        fast_config().with_site_order("example.com", vec![StrategyKind::ClipboardPaste]),
        EnvironmentProfile::plain().with_clipboard(),
    );

    let used = engine.insert_with_report(input.as_ref(), "Pasted prompt").await;
    assert_eq!(used, Some(StrategyKind::ClipboardPaste));
    assert_eq!(input.current_value(), "Pasted prompt");
    assert_eq!(clipboard.contents(), "Pasted prompt");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(clipboard.contents(), "user copied this");
    assert_eq!(clipboard.writes(), vec!["Pasted prompt", "user copied this"]);
}

#[tokio::test]
async fn test_clipboard_restored_when_paste_fails() {
    let doc = MemoryDocument::new("https://example.com");
    let clipboard = Arc::new(MemoryClipboard::with_text("user copied this"));
    doc.attach_clipboard(Arc::clone(&clipboard));
    let input = textarea(
        &doc,
        FrameworkBehavior {
            detached: true,
            ..Default::default()
        },
    );

    let engine = InsertionEngine::with_profile(
        Arc::clone(&doc) as _,
        Arc::clone(&clipboard) as _,
        fast_config().with_site_order("example.com", vec![StrategyKind::ClipboardPaste]),
        EnvironmentProfile::plain().with_clipboard(),
    );

    assert!(!engine.insert(input.as_ref(), "PROMPT").await);
    assert_eq!(input.current_value(), "");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(clipboard.contents(), "user copied this");
    assert_eq!(clipboard.writes(), vec!["PROMPT", "user copied this"]);
}

#[tokio::test]
async fn test_unreadable_clipboard_is_not_restored() {
    let doc = MemoryDocument::new("https://example.com");
    let clipboard = Arc::new(MemoryClipboard::with_text("secret"));
    clipboard.deny_reads();
    doc.attach_clipboard(Arc::clone(&clipboard));
    let input = textarea(&doc, FrameworkBehavior::default());

    let engine = InsertionEngine::with_profile(
        Arc::clone(&doc) as _,
        Arc::clone(&clipboard) as _,
        fast_config().with_site_order("example.com", vec![StrategyKind::ClipboardPaste]),
        EnvironmentProfile::plain().with_clipboard(),
    );

    assert!(engine.insert(input.as_ref(), "Pasted prompt").await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(clipboard.writes(), vec!["Pasted prompt"]);
}

#[tokio::test]
async fn test_clipboard_paste_skipped_without_access() {
    let doc = MemoryDocument::new("https://example.com");
    let clipboard = Arc::new(MemoryClipboard::new());
    doc.attach_clipboard(Arc::clone(&clipboard));
    let input = textarea(&doc, FrameworkBehavior::default());

    let engine = InsertionEngine::with_profile(
        Arc::clone(&doc) as _,
        Arc::clone(&clipboard) as _,
        fast_config().with_site_order("example.com", vec![StrategyKind::ClipboardPaste]),
        EnvironmentProfile::plain(),
    );

    assert!(!engine.insert(input.as_ref(), "text").await);
    assert!(clipboard.writes().is_empty());
}

// ============================================================================
// Recursion guard
// ============================================================================

/// Re-enters the engine on the same element from inside `apply`, the way an
/// input listener reacting to synthetic events would.
struct ReentrantStrategy {
    engine: OnceLock<Weak<InsertionEngine>>,
    calls: AtomicUsize,
}

#[async_trait]
impl InsertStrategy for ReentrantStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Standard
    }

    async fn apply(&self, element: &dyn Element, _mode: InsertMode, text: &str) -> DomResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(engine) = self.engine.get().and_then(Weak::upgrade) else {
            return Ok(false);
        };
        Ok(engine.insert(element, text).await)
    }
}

#[tokio::test]
async fn test_recursion_guard_stops_sixth_nested_call() {
    let doc = MemoryDocument::new("https://example.com");
    let input = textarea(&doc, FrameworkBehavior::default());

    let reentrant = Arc::new(ReentrantStrategy {
        engine: OnceLock::new(),
        calls: AtomicUsize::new(0),
    });
    let mut engine = engine(
        &doc,
        EnvironmentProfile::plain(),
        fast_config().with_site_order("example.com", vec![StrategyKind::Standard]),
    );
    engine.register_strategy(Arc::clone(&reentrant) as _);
    let engine = Arc::new(engine);
    assert!(reentrant.engine.set(Arc::downgrade(&engine)).is_ok());

    let inserted = tokio::time::timeout(
        Duration::from_secs(5),
        engine.insert(input.as_ref(), "loop"),
    )
    .await
    .expect("nested insertion must not hang");

    assert!(!inserted);
    assert_eq!(reentrant.calls.load(Ordering::SeqCst), 5);
    assert_eq!(engine.nesting_depth(input.as_ref()), 0);
    assert_eq!(input.current_value(), "");
}

// ============================================================================
// Strategy memoization
// ============================================================================

/// Records each attempt; writes the text only while switched on.
struct Recording {
    kind: StrategyKind,
    works: AtomicBool,
    log: Arc<Mutex<Vec<StrategyKind>>>,
}

#[async_trait]
impl InsertStrategy for Recording {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn apply(&self, element: &dyn Element, _mode: InsertMode, text: &str) -> DomResult<bool> {
        self.log.lock().push(self.kind);
        if !self.works.load(Ordering::SeqCst) {
            return Ok(false);
        }
        element.set_value(text).await?;
        Ok(true)
    }
}

struct Recorded {
    engine: InsertionEngine,
    log: Arc<Mutex<Vec<StrategyKind>>>,
    switches: HashMap<StrategyKind, Arc<Recording>>,
}

impl Recorded {
    fn new(doc: &Arc<MemoryDocument>, working: &[StrategyKind]) -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = engine(doc, EnvironmentProfile::plain(), fast_config());
        let mut switches = HashMap::new();
        for kind in [
            StrategyKind::Standard,
            StrategyKind::SimulatedTyping,
            StrategyKind::ObserverBypass,
        ] {
            let recording = Arc::new(Recording {
                kind,
                works: AtomicBool::new(working.contains(&kind)),
                log: Arc::clone(&log),
            });
            engine.register_strategy(Arc::clone(&recording) as _);
            switches.insert(kind, recording);
        }
        Self {
            engine,
            log,
            switches,
        }
    }

    fn set_working(&self, kind: StrategyKind, works: bool) {
        self.switches[&kind].works.store(works, Ordering::SeqCst);
    }

    fn take_log(&self) -> Vec<StrategyKind> {
        std::mem::take(&mut *self.log.lock())
    }
}

#[tokio::test]
async fn test_winner_is_tried_first_next_time() {
    let doc = MemoryDocument::new("https://example.com/page");
    let input = textarea(&doc, FrameworkBehavior::default());
    let recorded = Recorded::new(&doc, &[StrategyKind::SimulatedTyping]);

    assert!(recorded.engine.insert(input.as_ref(), "first").await);
    assert_eq!(
        recorded.take_log(),
        vec![StrategyKind::Standard, StrategyKind::SimulatedTyping]
    );
    assert_eq!(
        recorded.engine.cached_strategy("example.com"),
        Some(StrategyKind::SimulatedTyping)
    );

    // Cached winner still works: nothing else is tried
    assert!(recorded.engine.insert(input.as_ref(), "second").await);
    assert_eq!(recorded.take_log(), vec![StrategyKind::SimulatedTyping]);
    assert_eq!(input.current_value(), "second");
}

#[tokio::test]
async fn test_failed_cached_strategy_falls_back_without_retry() {
    let doc = MemoryDocument::new("https://example.com");
    let input = textarea(&doc, FrameworkBehavior::default());
    let recorded = Recorded::new(&doc, &[StrategyKind::SimulatedTyping]);

    assert!(recorded.engine.insert(input.as_ref(), "first").await);
    recorded.take_log();

    recorded.set_working(StrategyKind::SimulatedTyping, false);
    recorded.set_working(StrategyKind::ObserverBypass, true);

    assert!(recorded.engine.insert(input.as_ref(), "third").await);
    assert_eq!(
        recorded.take_log(),
        vec![
            StrategyKind::SimulatedTyping,
            StrategyKind::Standard,
            StrategyKind::ObserverBypass
        ]
    );
    assert_eq!(
        recorded.engine.cached_strategy("example.com"),
        Some(StrategyKind::ObserverBypass)
    );
}

#[tokio::test]
async fn test_cache_is_per_hostname() {
    let doc = MemoryDocument::new("https://example.com");
    let input = textarea(&doc, FrameworkBehavior::default());
    let recorded = Recorded::new(&doc, &[StrategyKind::SimulatedTyping]);

    assert!(recorded.engine.insert(input.as_ref(), "first").await);
    recorded.take_log();

    doc.set_location("https://other.example.org/");
    assert!(recorded.engine.insert(input.as_ref(), "elsewhere").await);
    assert_eq!(
        recorded.take_log(),
        vec![StrategyKind::Standard, StrategyKind::SimulatedTyping]
    );
}
