//! Document abstraction shared by the input locator and the insertion strategies.
//!
//! Two backends implement it: [`cdp`] drives a live Chromium page through the
//! page bridge script, [`memory`] is a headless document used offline and in tests.

pub mod cdp;
pub mod clipboard;
pub mod memory;
mod selector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use clipboard::{Clipboard, MemoryClipboard, SystemClipboard};

#[derive(Error, Debug)]
pub enum DomError {
    #[error("Script error: {0}")]
    Script(String),

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Not applicable: {0}")]
    NotApplicable(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

pub type DomResult<T> = std::result::Result<T, DomError>;

/// Access to a frame's document was refused by the same-origin policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cross-origin frame blocked: {0}")]
pub struct AccessDenied(pub String);

/// Identity of an element within one page context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Replace the UTF-16 range `[start, end)` of `current` with `insert`.
pub(crate) fn splice_utf16(current: &str, start: usize, end: usize, insert: &str) -> String {
    let units: Vec<u16> = current.encode_utf16().collect();
    let start = start.min(units.len());
    let end = end.clamp(start, units.len());
    let mut out: Vec<u16> = Vec::with_capacity(units.len() + insert.len());
    out.extend_from_slice(&units[..start]);
    out.extend(insert.encode_utf16());
    out.extend_from_slice(&units[end..]);
    String::from_utf16_lossy(&out)
}

pub type ElementRef = Arc<dyn Element>;
pub type DocumentRef = Arc<dyn Document>;

/// Synthetic events dispatched at a target element. Keyboard events carry the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomEvent {
    KeyDown(String),
    KeyPress(String),
    KeyUp(String),
    Input,
    Change,
    Blur,
    Focus,
    Paste,
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::KeyDown(_) => "keydown",
            DomEvent::KeyPress(_) => "keypress",
            DomEvent::KeyUp(_) => "keyup",
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::Blur => "blur",
            DomEvent::Focus => "focus",
            DomEvent::Paste => "paste",
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            DomEvent::KeyDown(key) | DomEvent::KeyPress(key) | DomEvent::KeyUp(key) => Some(key),
            _ => None,
        }
    }
}

/// Global markers read once from the page when an engine is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentMarkers {
    pub react: bool,
    pub vue: bool,
    pub angular: bool,
    pub shadow_dom: bool,
    pub clipboard_access: bool,
    pub secure_context: bool,
}

/// An element on the page.
///
/// Selection offsets are UTF-16 code units, as in the DOM.
#[async_trait]
pub trait Element: Send + Sync + fmt::Debug {
    fn id(&self) -> ElementId;

    /// Lowercase tag name
    async fn tag_name(&self) -> DomResult<String>;

    /// `type` of an `<input>`, `None` for other elements
    async fn input_type(&self) -> DomResult<Option<String>>;

    async fn attribute(&self, name: &str) -> DomResult<Option<String>>;

    /// The `isContentEditable` property
    async fn is_content_editable(&self) -> DomResult<bool>;

    /// Active element of this element's open shadow root, if any
    async fn shadow_active_element(&self) -> DomResult<Option<ElementRef>>;

    async fn value(&self) -> DomResult<String>;

    /// Ordinary `.value` assignment, which page frameworks may intercept
    async fn set_value(&self, value: &str) -> DomResult<()>;

    /// Write through the prototype's own `value` setter, bypassing instance overrides
    async fn set_value_native(&self, value: &str) -> DomResult<()>;

    async fn selection_range(&self) -> DomResult<(usize, usize)>;

    async fn set_selection_range(&self, start: usize, end: usize) -> DomResult<()>;

    async fn text_content(&self) -> DomResult<String>;

    /// Delete the live selection inside this element (or its whole contents
    /// when the selection lies elsewhere) and insert a text node in its place
    async fn replace_selection(&self, text: &str) -> DomResult<()>;

    /// `execCommand('insertText')`; `Ok(false)` when the page refused it
    async fn insert_text_command(&self, text: &str) -> DomResult<bool>;

    /// `execCommand('paste')`; `Ok(false)` when the command is unavailable
    async fn paste_command(&self) -> DomResult<bool>;

    async fn focus(&self) -> DomResult<()>;

    async fn select_all(&self) -> DomResult<()>;

    async fn dispatch(&self, event: &DomEvent) -> DomResult<()>;

    /// Whether a component framework attached its instance to this node
    async fn has_component_instance(&self) -> DomResult<bool>;

    /// Swap the owning window's `MutationObserver` for an inert stub
    async fn suspend_mutation_observers(&self) -> DomResult<()>;

    async fn restore_mutation_observers(&self) -> DomResult<()>;
}

/// A document (top-level page or same-origin frame).
#[async_trait]
pub trait Document: Send + Sync {
    async fn location(&self) -> DomResult<String>;

    async fn hostname(&self) -> DomResult<String> {
        let location = self.location().await?;
        Ok(url::Url::parse(&location)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default())
    }

    async fn active_element(&self) -> DomResult<Option<ElementRef>>;

    async fn query_selector(&self, selector: &str) -> DomResult<Option<ElementRef>>;

    async fn query_selector_all(&self, selector: &str) -> DomResult<Vec<ElementRef>>;

    async fn has_selection_anchor(&self) -> DomResult<bool>;

    /// Whether the selection's anchor node is `element` or one of its descendants
    async fn selection_anchor_within(&self, element: &dyn Element) -> DomResult<bool>;

    async fn selection_text(&self) -> DomResult<String>;

    /// Documents of child frames; cross-origin frames come back as `AccessDenied`
    async fn frames(&self) -> DomResult<Vec<Result<DocumentRef, AccessDenied>>>;

    async fn environment(&self) -> DomResult<EnvironmentMarkers>;
}
