//! Live Chromium documents driven over CDP.
//!
//! Every call evaluates a small snippet against `window.__promptpal`, a bridge
//! object installed once per page load. The bridge hands out numeric element
//! ids and resolves them back to nodes; its random session token changes when
//! the page navigates, which is how callers notice stale references.

use async_trait::async_trait;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

use super::{
    AccessDenied, Document, DocumentRef, DomError, DomEvent, DomResult, Element, ElementId,
    ElementRef, EnvironmentMarkers,
};

pub const BRIDGE_SCRIPT: &str = r#"
(() => {
  if (window.__promptpal) return window.__promptpal.session;
  const ids = new WeakMap();
  const refs = new Map();
  let next = 1;
  const bridge = {
    session: (window.crypto && crypto.randomUUID) ? crypto.randomUUID() : String(Date.now()) + '_' + Math.random().toString(36).slice(2),
    ref(el) {
      if (!el) return null;
      let id = ids.get(el);
      if (!id) {
        id = next++;
        ids.set(el, id);
        refs.set(id, new WeakRef(el));
      }
      return id;
    },
    get(id) {
      const held = refs.get(id);
      const el = held && held.deref();
      if (!el || !el.isConnected) throw new Error('stale:' + id);
      return el;
    },
    doc(frame) {
      if (frame === null) return document;
      const doc = bridge.get(frame).contentDocument;
      if (!doc) throw new Error('stale:' + frame);
      return doc;
    },
    fire(el, type, key) {
      const win = el.ownerDocument.defaultView || window;
      let event;
      if (key !== null) {
        event = new win.KeyboardEvent(type, { key, bubbles: true, cancelable: true });
      } else if (type === 'paste' && typeof win.ClipboardEvent === 'function') {
        event = new win.ClipboardEvent(type, { bubbles: true, cancelable: true });
      } else {
        event = new win.Event(type, { bubbles: true, cancelable: true });
      }
      el.dispatchEvent(event);
    },
    suspendObservers(win) {
      if (win.__promptpalObserver) return;
      win.__promptpalObserver = win.MutationObserver;
      win.MutationObserver = class {
        observe() {}
        disconnect() {}
        takeRecords() { return []; }
      };
    },
    restoreObservers(win) {
      if (!win.__promptpalObserver) return;
      win.MutationObserver = win.__promptpalObserver;
      delete win.__promptpalObserver;
    },
  };
  window.__promptpal = bridge;
  return bridge.session;
})()
"#;

const PING_SCRIPT: &str = "({ ok: window.__promptpal ? window.__promptpal.session : null })";

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: serde_json::Value,
    na: Option<String>,
}

fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

fn js_opt_id(id: Option<u64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "null".to_string())
}

fn map_eval_error(err: impl std::fmt::Display) -> DomError {
    let message = err.to_string();
    match message.find("stale:") {
        Some(pos) => DomError::StaleElement(message[pos..].to_string()),
        None => DomError::Script(message),
    }
}

/// Run `body` with `bridge` in scope. The body must return `{ ok }` or `{ na }`.
async fn run<T: DeserializeOwned>(page: &Page, body: &str) -> DomResult<T> {
    let script = format!(
        "(() => {{ const bridge = window.__promptpal; if (!bridge) throw new Error('stale:bridge'); {} }})()",
        body
    );
    let result = page.evaluate(script).await.map_err(map_eval_error)?;
    let envelope: Envelope = result
        .into_value()
        .map_err(|e| DomError::Script(format!("Failed to parse script result: {}", e)))?;
    if let Some(reason) = envelope.na {
        return Err(DomError::NotApplicable(reason));
    }
    serde_json::from_value(envelope.ok)
        .map_err(|e| DomError::Script(format!("Unexpected script result: {}", e)))
}

/// Install the bridge if needed and return its session token.
pub async fn install_bridge(page: &Page) -> DomResult<String> {
    let result = page.evaluate(BRIDGE_SCRIPT).await.map_err(map_eval_error)?;
    result
        .into_value()
        .map_err(|e| DomError::Script(format!("Failed to parse bridge session: {}", e)))
}

/// Session token of the installed bridge, `None` when the page has none.
pub async fn bridge_session(page: &Page) -> DomResult<Option<String>> {
    let result = page.evaluate(PING_SCRIPT).await.map_err(map_eval_error)?;
    let envelope: Envelope = result
        .into_value()
        .map_err(|e| DomError::Script(format!("Failed to parse ping result: {}", e)))?;
    serde_json::from_value(envelope.ok).map_err(|e| DomError::Script(e.to_string()))
}

pub struct CdpDocument {
    page: Page,
    /// Element id of the hosting `<iframe>`, `None` for the top document
    frame: Option<u64>,
}

impl CdpDocument {
    pub fn top(page: Page) -> Arc<Self> {
        Arc::new(Self { page, frame: None })
    }

    fn element(&self, id: u64) -> ElementRef {
        Arc::new(CdpElement {
            page: self.page.clone(),
            id: ElementId(id),
        })
    }

    async fn run_in_doc<T: DeserializeOwned>(&self, body: &str) -> DomResult<T> {
        let script = format!("const doc = bridge.doc({}); {}", js_opt_id(self.frame), body);
        run(&self.page, &script).await
    }
}

#[derive(Deserialize)]
struct FrameInfo {
    id: Option<u64>,
    accessible: bool,
    #[serde(default)]
    src: String,
}

#[async_trait]
impl Document for CdpDocument {
    async fn location(&self) -> DomResult<String> {
        self.run_in_doc("return { ok: String(doc.location.href) };")
            .await
    }

    async fn active_element(&self) -> DomResult<Option<ElementRef>> {
        let id: Option<u64> = self
            .run_in_doc("return { ok: bridge.ref(doc.activeElement) };")
            .await?;
        Ok(id.map(|id| self.element(id)))
    }

    async fn query_selector(&self, selector: &str) -> DomResult<Option<ElementRef>> {
        let body = format!(
            "return {{ ok: bridge.ref(doc.querySelector({})) }};",
            js_string(selector)
        );
        let id: Option<u64> = self.run_in_doc(&body).await?;
        Ok(id.map(|id| self.element(id)))
    }

    async fn query_selector_all(&self, selector: &str) -> DomResult<Vec<ElementRef>> {
        let body = format!(
            "return {{ ok: Array.from(doc.querySelectorAll({})).map((el) => bridge.ref(el)) }};",
            js_string(selector)
        );
        let ids: Vec<u64> = self.run_in_doc(&body).await?;
        Ok(ids.into_iter().map(|id| self.element(id)).collect())
    }

    async fn has_selection_anchor(&self) -> DomResult<bool> {
        self.run_in_doc("const sel = doc.getSelection(); return { ok: !!(sel && sel.anchorNode) };")
            .await
    }

    async fn selection_anchor_within(&self, element: &dyn Element) -> DomResult<bool> {
        let body = format!(
            "const sel = doc.getSelection(); const anchor = sel && sel.anchorNode; \
             return {{ ok: !!anchor && bridge.get({}).contains(anchor) }};",
            element.id().0
        );
        self.run_in_doc(&body).await
    }

    async fn selection_text(&self) -> DomResult<String> {
        self.run_in_doc("const sel = doc.getSelection(); return { ok: sel ? String(sel) : '' };")
            .await
    }

    async fn frames(&self) -> DomResult<Vec<Result<DocumentRef, AccessDenied>>> {
        let infos: Vec<FrameInfo> = self
            .run_in_doc(
                "return { ok: Array.from(doc.querySelectorAll('iframe')).map((frame) => { \
                   try { \
                     return frame.contentDocument \
                       ? { id: bridge.ref(frame), accessible: true, src: frame.src } \
                       : { id: null, accessible: false, src: frame.src }; \
                   } catch (e) { return { id: null, accessible: false, src: frame.src }; } \
                 }) };",
            )
            .await?;
        Ok(infos
            .into_iter()
            .map(|info| match (info.accessible, info.id) {
                (true, Some(id)) => Ok(Arc::new(CdpDocument {
                    page: self.page.clone(),
                    frame: Some(id),
                }) as DocumentRef),
                _ => Err(AccessDenied(info.src)),
            })
            .collect())
    }

    async fn environment(&self) -> DomResult<EnvironmentMarkers> {
        self.run_in_doc(
            "const win = doc.defaultView || window; return { ok: { \
               react: !!win.__REACT_DEVTOOLS_GLOBAL_HOOK__ || !!doc.querySelector('[data-reactroot]'), \
               vue: !!win.__VUE_DEVTOOLS_GLOBAL_HOOK__ || !!win.__VUE__, \
               angular: !!win.ng || typeof win.getAllAngularRootElements === 'function', \
               shadowDom: typeof win.Element.prototype.attachShadow === 'function', \
               clipboardAccess: !!(win.navigator.clipboard && win.isSecureContext), \
               secureContext: !!win.isSecureContext \
             } };",
        )
        .await
    }
}

#[derive(Debug, Clone)]
pub struct CdpElement {
    page: Page,
    id: ElementId,
}

impl CdpElement {
    async fn call<T: DeserializeOwned>(&self, body: &str) -> DomResult<T> {
        let script = format!("const el = bridge.get({}); {}", self.id.0, body);
        run(&self.page, &script).await
    }
}

#[async_trait]
impl Element for CdpElement {
    fn id(&self) -> ElementId {
        self.id
    }

    async fn tag_name(&self) -> DomResult<String> {
        self.call("return { ok: el.tagName.toLowerCase() };").await
    }

    async fn input_type(&self) -> DomResult<Option<String>> {
        self.call("return { ok: el.tagName === 'INPUT' ? String(el.type || 'text').toLowerCase() : null };")
            .await
    }

    async fn attribute(&self, name: &str) -> DomResult<Option<String>> {
        self.call(&format!("return {{ ok: el.getAttribute({}) }};", js_string(name)))
            .await
    }

    async fn is_content_editable(&self) -> DomResult<bool> {
        self.call("return { ok: !!el.isContentEditable };").await
    }

    async fn shadow_active_element(&self) -> DomResult<Option<ElementRef>> {
        let id: Option<u64> = self
            .call("return { ok: el.shadowRoot ? bridge.ref(el.shadowRoot.activeElement) : null };")
            .await?;
        Ok(id.map(|id| {
            Arc::new(CdpElement {
                page: self.page.clone(),
                id: ElementId(id),
            }) as ElementRef
        }))
    }

    async fn value(&self) -> DomResult<String> {
        self.call("return { ok: typeof el.value === 'string' ? el.value : '' };")
            .await
    }

    async fn set_value(&self, value: &str) -> DomResult<()> {
        self.call(&format!("el.value = {}; return {{ ok: null }};", js_string(value)))
            .await
    }

    async fn set_value_native(&self, value: &str) -> DomResult<()> {
        let body = format!(
            "const win = el.ownerDocument.defaultView || window; \
             const proto = el.tagName === 'TEXTAREA' ? win.HTMLTextAreaElement.prototype \
               : el.tagName === 'INPUT' ? win.HTMLInputElement.prototype : null; \
             const descriptor = proto && Object.getOwnPropertyDescriptor(proto, 'value'); \
             if (!descriptor || !descriptor.set) return {{ na: 'no native value setter on ' + el.tagName }}; \
             descriptor.set.call(el, {}); \
             return {{ ok: null }};",
            js_string(value)
        );
        self.call(&body).await
    }

    async fn selection_range(&self) -> DomResult<(usize, usize)> {
        self.call(
            "const len = typeof el.value === 'string' ? el.value.length : 0; \
             let start = len, end = len; \
             try { \
               if (typeof el.selectionStart === 'number') start = el.selectionStart; \
               if (typeof el.selectionEnd === 'number') end = el.selectionEnd; \
             } catch (e) {} \
             return { ok: [start, end] };",
        )
        .await
    }

    async fn set_selection_range(&self, start: usize, end: usize) -> DomResult<()> {
        let body = format!(
            "if (typeof el.setSelectionRange !== 'function') return {{ na: 'setSelectionRange' }}; \
             el.setSelectionRange({}, {}); return {{ ok: null }};",
            start, end
        );
        self.call(&body).await
    }

    async fn text_content(&self) -> DomResult<String> {
        self.call("return { ok: el.textContent || '' };").await
    }

    async fn replace_selection(&self, text: &str) -> DomResult<()> {
        let body = format!(
            "el.focus(); \
             const doc = el.ownerDocument; \
             const sel = doc.getSelection(); \
             let range; \
             if (sel && sel.rangeCount > 0 && el.contains(sel.getRangeAt(0).commonAncestorContainer)) {{ \
               range = sel.getRangeAt(0); \
             }} else {{ \
               range = doc.createRange(); \
               range.selectNodeContents(el); \
             }} \
             range.deleteContents(); \
             const node = doc.createTextNode({}); \
             range.insertNode(node); \
             range.setStartAfter(node); \
             range.collapse(true); \
             if (sel) {{ sel.removeAllRanges(); sel.addRange(range); }} \
             return {{ ok: null }};",
            js_string(text)
        );
        self.call(&body).await
    }

    async fn insert_text_command(&self, text: &str) -> DomResult<bool> {
        self.call(&format!(
            "return {{ ok: !!el.ownerDocument.execCommand('insertText', false, {}) }};",
            js_string(text)
        ))
        .await
    }

    async fn paste_command(&self) -> DomResult<bool> {
        self.call("return { ok: !!el.ownerDocument.execCommand('paste') };")
            .await
    }

    async fn focus(&self) -> DomResult<()> {
        self.call("el.focus(); return { ok: null };").await
    }

    async fn select_all(&self) -> DomResult<()> {
        self.call(
            "if (typeof el.select === 'function') { el.select(); return { ok: null }; } \
             const doc = el.ownerDocument; \
             const range = doc.createRange(); \
             range.selectNodeContents(el); \
             const sel = doc.getSelection(); \
             if (sel) { sel.removeAllRanges(); sel.addRange(range); } \
             return { ok: null };",
        )
        .await
    }

    async fn dispatch(&self, event: &DomEvent) -> DomResult<()> {
        let key = event
            .key()
            .map(js_string)
            .unwrap_or_else(|| "null".to_string());
        self.call(&format!(
            "bridge.fire(el, '{}', {}); return {{ ok: null }};",
            event.name(),
            key
        ))
        .await
    }

    async fn has_component_instance(&self) -> DomResult<bool> {
        self.call("return { ok: !!(el.__vue__ || el.__vueParentComponent) };")
            .await
    }

    async fn suspend_mutation_observers(&self) -> DomResult<()> {
        self.call("bridge.suspendObservers(el.ownerDocument.defaultView || window); return { ok: null };")
            .await
    }

    async fn restore_mutation_observers(&self) -> DomResult<()> {
        self.call("bridge.restoreObservers(el.ownerDocument.defaultView || window); return { ok: null };")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes_and_newlines() {
        assert_eq!(js_string("it's \"here\"\n"), r#""it's \"here\"\n""#);
    }

    #[test]
    fn test_stale_errors_are_recognised() {
        assert!(matches!(
            map_eval_error("Uncaught Error: stale:12"),
            DomError::StaleElement(ref m) if m == "stale:12"
        ));
        assert!(matches!(map_eval_error("TypeError: x"), DomError::Script(_)));
    }
}
