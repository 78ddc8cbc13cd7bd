//! Headless in-memory document.
//!
//! Elements carry a [`FrameworkBehavior`] describing how a host page framework
//! reacts to programmatic writes, so insertion strategies can be exercised
//! without a browser.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::clipboard::MemoryClipboard;
use super::selector::{Matchable, SelectorList};
use super::{
    splice_utf16, utf16_len, AccessDenied, Document, DocumentRef, DomError, DomEvent, DomResult,
    Element, ElementId, ElementRef, EnvironmentMarkers,
};

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// How the page reacts to programmatic writes on one element.
#[derive(Debug, Clone, Copy)]
pub struct FrameworkBehavior {
    /// A controlled component re-renders its own state over plain `.value` writes
    pub swallows_plain_assignment: bool,
    pub native_setter_throws: bool,
    /// Writes made while mutation observers are live are rolled back
    pub reverts_observed_mutations: bool,
    pub component_instance: bool,
    pub paste_command: bool,
    pub insert_text_command: bool,
    /// Removed from the page after it was located; focusing it fails
    pub detached: bool,
}

impl Default for FrameworkBehavior {
    fn default() -> Self {
        Self {
            swallows_plain_assignment: false,
            native_setter_throws: false,
            reverts_observed_mutations: false,
            component_instance: false,
            paste_command: true,
            insert_text_command: true,
            detached: false,
        }
    }
}

/// Window-level state shared by a document and its elements.
#[derive(Debug, Default)]
struct WindowState {
    clipboard: RwLock<Option<Arc<MemoryClipboard>>>,
    observers_suspended: AtomicBool,
    suspensions: AtomicUsize,
}

type Listener = Arc<dyn Fn(&MemoryElement, &DomEvent) + Send + Sync>;

struct ElementState {
    input_type: Option<String>,
    attributes: BTreeMap<String, String>,
    content_editable: bool,
    value: String,
    text: String,
    selection: Option<(usize, usize)>,
    focused: bool,
    shadow_active: Option<Arc<MemoryElement>>,
    behavior: FrameworkBehavior,
    events: Vec<DomEvent>,
}

pub struct MemoryElement {
    id: ElementId,
    tag: String,
    window: Arc<WindowState>,
    state: Mutex<ElementState>,
    children: Mutex<Vec<Arc<MemoryElement>>>,
    listeners: Mutex<Vec<Listener>>,
}

impl fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryElement")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .finish()
    }
}

impl MemoryElement {
    fn new(tag: &str, window: Arc<WindowState>) -> Self {
        let tag = tag.to_lowercase();
        let input_type = (tag == "input").then(|| "text".to_string());
        Self {
            id: ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed)),
            tag,
            window,
            state: Mutex::new(ElementState {
                input_type,
                attributes: BTreeMap::new(),
                content_editable: false,
                value: String::new(),
                text: String::new(),
                selection: None,
                focused: false,
                shadow_active: None,
                behavior: FrameworkBehavior::default(),
                events: Vec::new(),
            }),
            children: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> &Self {
        let mut state = self.state.lock();
        let name = name.to_lowercase();
        if name == "type" && self.tag == "input" {
            state.input_type = Some(value.to_lowercase());
        }
        if name == "contenteditable" {
            state.content_editable = value.is_empty() || value.eq_ignore_ascii_case("true");
        }
        state.attributes.insert(name, value.to_string());
        self
    }

    pub fn make_content_editable(&self) -> &Self {
        self.set_attribute("contenteditable", "true")
    }

    /// Editable through the property only, e.g. inherited from an ancestor
    pub fn inherit_content_editable(&self) -> &Self {
        self.state.lock().content_editable = true;
        self
    }

    pub fn set_behavior(&self, behavior: FrameworkBehavior) -> &Self {
        self.state.lock().behavior = behavior;
        self
    }

    pub fn set_initial_value(&self, value: &str) -> &Self {
        let mut state = self.state.lock();
        state.value = value.to_string();
        let end = utf16_len(value);
        state.selection = Some((end, end));
        self
    }

    pub fn set_initial_text(&self, text: &str) -> &Self {
        self.state.lock().text = text.to_string();
        self
    }

    /// Place the caret/selection (UTF-16 offsets into value or text)
    pub fn place_selection(&self, start: usize, end: usize) -> &Self {
        self.state.lock().selection = Some((start, end));
        self
    }

    pub fn set_shadow_active(&self, inner: &Arc<MemoryElement>) -> &Self {
        self.state.lock().shadow_active = Some(Arc::clone(inner));
        self
    }

    pub fn append_child(&self, child: &Arc<MemoryElement>) -> &Self {
        self.children.lock().push(Arc::clone(child));
        self
    }

    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&MemoryElement, &DomEvent) + Send + Sync + 'static,
    {
        self.listeners.lock().push(Arc::new(listener));
    }

    pub fn current_value(&self) -> String {
        self.state.lock().value.clone()
    }

    pub fn current_text(&self) -> String {
        let own = self.state.lock().text.clone();
        let children: Vec<Arc<MemoryElement>> = self.children.lock().clone();
        children
            .iter()
            .fold(own, |acc, child| acc + &child.current_text())
    }

    pub fn events(&self) -> Vec<DomEvent> {
        self.state.lock().events.clone()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.state.lock().events.iter().map(DomEvent::name).collect()
    }

    pub fn is_focused(&self) -> bool {
        self.state.lock().focused
    }

    fn is_form_control(&self) -> bool {
        self.tag == "textarea" || self.tag == "input"
    }

    fn write_blocked(&self, state: &ElementState) -> bool {
        state.behavior.reverts_observed_mutations
            && !self.window.observers_suspended.load(Ordering::SeqCst)
    }

    fn contains_id(&self, id: ElementId) -> bool {
        if self.id == id {
            return true;
        }
        let children: Vec<Arc<MemoryElement>> = self.children.lock().clone();
        children.iter().any(|child| child.contains_id(id))
    }

    fn collect_descendants(self: &Arc<Self>, out: &mut Vec<Arc<MemoryElement>>) {
        out.push(Arc::clone(self));
        let children: Vec<Arc<MemoryElement>> = self.children.lock().clone();
        for child in &children {
            child.collect_descendants(out);
        }
    }

    /// Insert at the caret of an editable host, collapsing the caret after the text
    fn insert_at_caret(state: &mut ElementState, text: &str, content: bool) {
        let target = if content { &mut state.text } else { &mut state.value };
        let len = utf16_len(target);
        let (start, end) = state.selection.unwrap_or((len, len));
        *target = splice_utf16(target, start, end, text);
        let caret = start.min(len) + utf16_len(text);
        state.selection = Some((caret, caret));
    }
}

impl Matchable for MemoryElement {
    fn tag(&self) -> String {
        self.tag.clone()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.state.lock().attributes.get(&name.to_lowercase()).cloned()
    }
}

#[async_trait]
impl Element for MemoryElement {
    fn id(&self) -> ElementId {
        self.id
    }

    async fn tag_name(&self) -> DomResult<String> {
        Ok(self.tag.clone())
    }

    async fn input_type(&self) -> DomResult<Option<String>> {
        Ok(self.state.lock().input_type.clone())
    }

    async fn attribute(&self, name: &str) -> DomResult<Option<String>> {
        Ok(self.attr(name))
    }

    async fn is_content_editable(&self) -> DomResult<bool> {
        Ok(self.state.lock().content_editable)
    }

    async fn shadow_active_element(&self) -> DomResult<Option<ElementRef>> {
        Ok(self
            .state
            .lock()
            .shadow_active
            .clone()
            .map(|inner| inner as ElementRef))
    }

    async fn value(&self) -> DomResult<String> {
        if !self.is_form_control() {
            return Ok(String::new());
        }
        Ok(self.state.lock().value.clone())
    }

    async fn set_value(&self, value: &str) -> DomResult<()> {
        let mut state = self.state.lock();
        if state.behavior.swallows_plain_assignment || self.write_blocked(&state) {
            return Ok(());
        }
        state.value = value.to_string();
        let end = utf16_len(value);
        state.selection = Some((end, end));
        Ok(())
    }

    async fn set_value_native(&self, value: &str) -> DomResult<()> {
        if !self.is_form_control() {
            return Err(DomError::NotApplicable(format!(
                "<{}> has no native value setter",
                self.tag
            )));
        }
        let mut state = self.state.lock();
        if state.behavior.native_setter_throws {
            return Err(DomError::Script("Illegal invocation".to_string()));
        }
        if self.write_blocked(&state) {
            return Ok(());
        }
        state.value = value.to_string();
        let end = utf16_len(value);
        state.selection = Some((end, end));
        Ok(())
    }

    async fn selection_range(&self) -> DomResult<(usize, usize)> {
        let state = self.state.lock();
        let len = utf16_len(&state.value);
        Ok(state.selection.unwrap_or((len, len)))
    }

    async fn set_selection_range(&self, start: usize, end: usize) -> DomResult<()> {
        if !self.is_form_control() {
            return Err(DomError::NotApplicable("setSelectionRange".to_string()));
        }
        self.state.lock().selection = Some((start, end));
        Ok(())
    }

    async fn text_content(&self) -> DomResult<String> {
        Ok(self.current_text())
    }

    async fn replace_selection(&self, text: &str) -> DomResult<()> {
        let mut state = self.state.lock();
        state.focused = true;
        if self.write_blocked(&state) {
            return Ok(());
        }
        if state.selection.is_none() {
            state.text.clear();
        }
        Self::insert_at_caret(&mut state, text, true);
        Ok(())
    }

    async fn insert_text_command(&self, text: &str) -> DomResult<bool> {
        let mut state = self.state.lock();
        if !state.behavior.insert_text_command {
            return Ok(false);
        }
        if self.write_blocked(&state) {
            return Ok(true);
        }
        let content = !self.is_form_control();
        if !content && state.behavior.swallows_plain_assignment {
            return Ok(true);
        }
        Self::insert_at_caret(&mut state, text, content);
        Ok(true)
    }

    async fn paste_command(&self) -> DomResult<bool> {
        let clipboard = self.window.clipboard.read().clone();
        let Some(clipboard) = clipboard else {
            return Ok(false);
        };
        let mut state = self.state.lock();
        if !state.behavior.paste_command {
            return Ok(false);
        }
        if self.write_blocked(&state) {
            return Ok(true);
        }
        let text = clipboard.contents();
        Self::insert_at_caret(&mut state, &text, !self.is_form_control());
        Ok(true)
    }

    async fn focus(&self) -> DomResult<()> {
        let mut state = self.state.lock();
        if state.behavior.detached {
            return Err(DomError::StaleElement(self.tag.clone()));
        }
        state.focused = true;
        Ok(())
    }

    async fn select_all(&self) -> DomResult<()> {
        let mut state = self.state.lock();
        let len = if self.is_form_control() {
            utf16_len(&state.value)
        } else {
            utf16_len(&state.text)
        };
        state.selection = Some((0, len));
        Ok(())
    }

    async fn dispatch(&self, event: &DomEvent) -> DomResult<()> {
        self.state.lock().events.push(event.clone());
        let listeners: Vec<Listener> = self.listeners.lock().clone();
        for listener in listeners {
            listener(self, event);
        }
        Ok(())
    }

    async fn has_component_instance(&self) -> DomResult<bool> {
        Ok(self.state.lock().behavior.component_instance)
    }

    async fn suspend_mutation_observers(&self) -> DomResult<()> {
        self.window.observers_suspended.store(true, Ordering::SeqCst);
        self.window.suspensions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn restore_mutation_observers(&self) -> DomResult<()> {
        self.window.observers_suspended.store(false, Ordering::SeqCst);
        Ok(())
    }
}

enum FrameSlot {
    SameOrigin(Arc<MemoryDocument>),
    CrossOrigin(String),
}

#[derive(Default)]
struct DocumentState {
    roots: Vec<Arc<MemoryElement>>,
    active: Option<Arc<MemoryElement>>,
    selection_anchor: Option<ElementId>,
    selection_text: String,
    frames: Vec<FrameSlot>,
    environment: EnvironmentMarkers,
}

/// A document with its own window.
pub struct MemoryDocument {
    location: RwLock<String>,
    window: Arc<WindowState>,
    state: Mutex<DocumentState>,
}

impl MemoryDocument {
    pub fn new(location: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            location: RwLock::new(location.into()),
            window: Arc::new(WindowState::default()),
            state: Mutex::new(DocumentState::default()),
        })
    }

    /// Create a detached element owned by this document's window
    pub fn create_element(&self, tag: &str) -> Arc<MemoryElement> {
        Arc::new(MemoryElement::new(tag, Arc::clone(&self.window)))
    }

    /// Create an element and append it at the top level
    pub fn append(&self, tag: &str) -> Arc<MemoryElement> {
        let element = self.create_element(tag);
        self.state.lock().roots.push(Arc::clone(&element));
        element
    }

    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.write() = location.into();
    }

    pub fn set_active(&self, element: &Arc<MemoryElement>) {
        self.state.lock().active = Some(Arc::clone(element));
    }

    pub fn clear_active(&self) {
        self.state.lock().active = None;
    }

    pub fn set_selection(&self, anchor: &Arc<MemoryElement>, text: impl Into<String>) {
        let mut state = self.state.lock();
        state.selection_anchor = Some(anchor.id);
        state.selection_text = text.into();
    }

    pub fn set_environment(&self, environment: EnvironmentMarkers) {
        self.state.lock().environment = environment;
    }

    pub fn attach_clipboard(&self, clipboard: Arc<MemoryClipboard>) {
        *self.window.clipboard.write() = Some(clipboard);
    }

    pub fn add_frame(&self, frame: Arc<MemoryDocument>) {
        self.state.lock().frames.push(FrameSlot::SameOrigin(frame));
    }

    pub fn add_cross_origin_frame(&self, src: impl Into<String>) {
        self.state
            .lock()
            .frames
            .push(FrameSlot::CrossOrigin(src.into()));
    }

    /// How many times an element in this window suspended mutation observers
    pub fn observer_suspensions(&self) -> usize {
        self.window.suspensions.load(Ordering::SeqCst)
    }

    pub fn observers_suspended(&self) -> bool {
        self.window.observers_suspended.load(Ordering::SeqCst)
    }

    fn all_elements(&self) -> Vec<Arc<MemoryElement>> {
        let roots = self.state.lock().roots.clone();
        let mut out = Vec::new();
        for root in &roots {
            root.collect_descendants(&mut out);
        }
        out
    }

    fn matching(&self, selector: &str) -> DomResult<Vec<Arc<MemoryElement>>> {
        let list = SelectorList::parse(selector).map_err(DomError::Script)?;
        Ok(self
            .all_elements()
            .into_iter()
            .filter(|element| list.matches(element.as_ref()))
            .collect())
    }
}

#[async_trait]
impl Document for MemoryDocument {
    async fn location(&self) -> DomResult<String> {
        Ok(self.location.read().clone())
    }

    async fn active_element(&self) -> DomResult<Option<ElementRef>> {
        Ok(self
            .state
            .lock()
            .active
            .clone()
            .map(|element| element as ElementRef))
    }

    async fn query_selector(&self, selector: &str) -> DomResult<Option<ElementRef>> {
        Ok(self
            .matching(selector)?
            .into_iter()
            .next()
            .map(|element| element as ElementRef))
    }

    async fn query_selector_all(&self, selector: &str) -> DomResult<Vec<ElementRef>> {
        Ok(self
            .matching(selector)?
            .into_iter()
            .map(|element| element as ElementRef)
            .collect())
    }

    async fn has_selection_anchor(&self) -> DomResult<bool> {
        Ok(self.state.lock().selection_anchor.is_some())
    }

    async fn selection_anchor_within(&self, element: &dyn Element) -> DomResult<bool> {
        let Some(anchor) = self.state.lock().selection_anchor else {
            return Ok(false);
        };
        let target = element.id();
        Ok(self
            .all_elements()
            .iter()
            .find(|candidate| candidate.id == target)
            .is_some_and(|candidate| candidate.contains_id(anchor)))
    }

    async fn selection_text(&self) -> DomResult<String> {
        Ok(self.state.lock().selection_text.clone())
    }

    async fn frames(&self) -> DomResult<Vec<Result<DocumentRef, AccessDenied>>> {
        let state = self.state.lock();
        Ok(state
            .frames
            .iter()
            .map(|slot| match slot {
                FrameSlot::SameOrigin(doc) => Ok(Arc::clone(doc) as DocumentRef),
                FrameSlot::CrossOrigin(src) => Err(AccessDenied(src.clone())),
            })
            .collect())
    }

    async fn environment(&self) -> DomResult<EnvironmentMarkers> {
        Ok(self.state.lock().environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_utf16_replaces_range() {
        assert_eq!(splice_utf16("hello world", 6, 11, "rust"), "hello rust");
        assert_eq!(splice_utf16("abc", 1, 1, "X"), "aXbc");
        assert_eq!(splice_utf16("abc", 10, 20, "!"), "abc!");
        // the emoji occupies two UTF-16 units
        assert_eq!(splice_utf16("😀b", 2, 3, "c"), "😀c");
    }

    #[tokio::test]
    async fn test_swallowed_assignment_keeps_old_value() {
        let doc = MemoryDocument::new("https://example.com");
        let input = doc.append("textarea");
        input.set_initial_value("old").set_behavior(FrameworkBehavior {
            swallows_plain_assignment: true,
            ..Default::default()
        });

        input.set_value("new").await.unwrap();
        assert_eq!(input.current_value(), "old");

        input.set_value_native("new").await.unwrap();
        assert_eq!(input.current_value(), "new");
    }

    #[tokio::test]
    async fn test_observed_writes_roll_back_until_suspended() {
        let doc = MemoryDocument::new("https://example.com");
        let input = doc.append("input");
        input.set_behavior(FrameworkBehavior {
            reverts_observed_mutations: true,
            ..Default::default()
        });

        input.set_value_native("one").await.unwrap();
        assert_eq!(input.current_value(), "");

        input.suspend_mutation_observers().await.unwrap();
        input.set_value_native("two").await.unwrap();
        input.restore_mutation_observers().await.unwrap();
        assert_eq!(input.current_value(), "two");
        assert_eq!(doc.observer_suspensions(), 1);
        assert!(!doc.observers_suspended());
    }

    #[tokio::test]
    async fn test_query_selector_walks_children_in_order() {
        let doc = MemoryDocument::new("https://example.com");
        let form = doc.append("form");
        let first = doc.create_element("div");
        first.set_attribute("role", "textbox");
        let second = doc.create_element("div");
        second.set_attribute("role", "textbox");
        form.append_child(&first).append_child(&second);

        let found = doc.query_selector(r#"[role="textbox"]"#).await.unwrap().unwrap();
        assert_eq!(found.id(), first.id());
        assert_eq!(doc.query_selector_all("div").await.unwrap().len(), 2);
    }
}
