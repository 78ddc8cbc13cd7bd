//! Integration tests for the input locator cascade.

use promptpal_sidecar::dom::memory::MemoryDocument;
use promptpal_sidecar::dom::Element;
use promptpal_sidecar::locator::{InputLocator, InsertMode};

// ============================================================================
// Step 1: focused element
// ============================================================================

#[tokio::test]
async fn test_focused_textarea_beats_aria_textbox() {
    let doc = MemoryDocument::new("https://example.com");
    let textbox = doc.append("div");
    textbox.set_attribute("role", "textbox");
    let textarea = doc.append("textarea");
    doc.set_active(&textarea);

    let target = InputLocator::new().locate(doc.as_ref()).await.unwrap();

    assert_eq!(target.element.id(), textarea.id());
    assert_eq!(target.mode, InsertMode::Value);
    assert!(!target.in_iframe);
}

#[tokio::test]
async fn test_focus_descends_into_shadow_roots() {
    let doc = MemoryDocument::new("https://example.com");
    let host = doc.append("chat-composer");
    let middle = doc.create_element("composer-body");
    let inner = doc.create_element("div");
    inner.make_content_editable();
    middle.set_shadow_active(&inner);
    host.set_shadow_active(&middle);
    doc.set_active(&host);

    let target = InputLocator::new().locate(doc.as_ref()).await.unwrap();

    assert_eq!(target.element.id(), inner.id());
    assert_eq!(target.mode, InsertMode::Content);
}

#[tokio::test]
async fn test_focused_non_input_falls_through() {
    let doc = MemoryDocument::new("https://example.com");
    let button = doc.append("button");
    let checkbox = doc.append("input");
    checkbox.set_attribute("type", "checkbox");
    let textbox = doc.append("div");
    textbox.set_attribute("role", "textbox");
    doc.set_active(&button);

    let target = InputLocator::new().locate(doc.as_ref()).await.unwrap();
    assert_eq!(target.element.id(), textbox.id());

    doc.set_active(&checkbox);
    let target = InputLocator::new().locate(doc.as_ref()).await.unwrap();
    assert_eq!(target.element.id(), textbox.id());
}

// ============================================================================
// Step 2: site selectors
// ============================================================================

#[tokio::test]
async fn test_chatgpt_composer_by_id() {
    let doc = MemoryDocument::new("https://chatgpt.com/");
    let other = doc.append("div");
    other.make_content_editable();
    let composer = doc.append("textarea");
    composer.set_attribute("id", "prompt-textarea");

    let target = InputLocator::new().locate(doc.as_ref()).await.unwrap();

    assert_eq!(target.element.id(), composer.id());
    assert_eq!(target.mode, InsertMode::Value);
}

#[tokio::test]
async fn test_gemini_quill_editor() {
    let doc = MemoryDocument::new("https://gemini.google.com/app");
    let editor = doc.append("div");
    editor
        .set_attribute("class", "ql-editor textarea")
        .set_attribute("contenteditable", "true");

    let target = InputLocator::new().locate(doc.as_ref()).await.unwrap();

    assert_eq!(target.element.id(), editor.id());
    assert_eq!(target.mode, InsertMode::Content);
}

#[tokio::test]
async fn test_site_selectors_ignored_on_other_hosts() {
    let doc = MemoryDocument::new("https://example.com");
    let composer = doc.append("textarea");
    composer.set_attribute("id", "prompt-textarea");

    assert!(InputLocator::new().locate(doc.as_ref()).await.is_none());
}

// ============================================================================
// Step 3: selection anchor
// ============================================================================

#[tokio::test]
async fn test_selection_inside_contenteditable() {
    let doc = MemoryDocument::new("https://example.com");
    let unrelated = doc.append("div");
    unrelated.set_attribute("contenteditable", "true");
    let editor = doc.append("div");
    editor.set_attribute("contenteditable", "true");
    let paragraph = doc.create_element("p");
    editor.append_child(&paragraph);
    doc.set_selection(&paragraph, "selected words");

    let target = InputLocator::new().locate(doc.as_ref()).await.unwrap();

    assert_eq!(target.element.id(), editor.id());
    assert_eq!(target.mode, InsertMode::Content);
}

// ============================================================================
// Step 4: ARIA textbox
// ============================================================================

#[tokio::test]
async fn test_first_aria_textbox_in_document_order() {
    let doc = MemoryDocument::new("https://example.com");
    let section = doc.append("section");
    let first = doc.create_element("div");
    first.set_attribute("role", "textbox");
    section.append_child(&first);
    let second = doc.append("div");
    second.set_attribute("role", "textbox");

    let target = InputLocator::new().locate(doc.as_ref()).await.unwrap();
    assert_eq!(target.element.id(), first.id());
}

// ============================================================================
// Step 5: frames
// ============================================================================

#[tokio::test]
async fn test_cross_origin_frames_are_skipped() {
    let doc = MemoryDocument::new("https://example.com");
    doc.add_cross_origin_frame("https://ads.example.net/frame");

    let frame = MemoryDocument::new("https://example.com/editor");
    let input = frame.append("input");
    input.set_attribute("type", "search");
    frame.set_active(&input);
    doc.add_frame(frame);

    let target = InputLocator::new().locate(doc.as_ref()).await.unwrap();

    assert_eq!(target.element.id(), input.id());
    assert!(target.in_iframe);
}

#[tokio::test]
async fn test_frame_without_focus_is_ignored() {
    let doc = MemoryDocument::new("https://example.com");
    let frame = MemoryDocument::new("https://example.com/editor");
    frame.append("textarea");
    doc.add_frame(frame);
    doc.add_cross_origin_frame("https://other.example.net/");

    assert!(InputLocator::new().locate(doc.as_ref()).await.is_none());
}

#[tokio::test]
async fn test_empty_document() {
    let doc = MemoryDocument::new("about:blank");
    assert!(InputLocator::new().locate(doc.as_ref()).await.is_none());
}
