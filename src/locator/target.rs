use std::fmt;

use crate::dom::{DomResult, Element, ElementRef};

/// Input types that accept free text
const TEXT_INPUT_TYPES: [&str; 4] = ["text", "search", "email", "url"];

/// How text is written into a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Form controls edited through `.value`
    Value,
    /// contenteditable hosts and ARIA textboxes edited through the selection
    Content,
}

impl InsertMode {
    pub async fn of(element: &dyn Element) -> DomResult<Self> {
        if is_content_target(element).await? {
            Ok(InsertMode::Content)
        } else {
            Ok(InsertMode::Value)
        }
    }
}

/// The element chosen to receive text, for one insertion workflow.
#[derive(Clone)]
pub struct InputTarget {
    pub element: ElementRef,
    pub mode: InsertMode,
    pub in_iframe: bool,
}

impl fmt::Debug for InputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputTarget")
            .field("element", &self.element.id())
            .field("mode", &self.mode)
            .field("in_iframe", &self.in_iframe)
            .finish()
    }
}

impl InputTarget {
    pub async fn new(element: ElementRef, in_iframe: bool) -> DomResult<Self> {
        let mode = InsertMode::of(element.as_ref()).await?;
        Ok(Self {
            element,
            mode,
            in_iframe,
        })
    }
}

async fn is_content_target(element: &dyn Element) -> DomResult<bool> {
    if element.is_content_editable().await? {
        return Ok(true);
    }
    if element.attribute("contenteditable").await?.as_deref() == Some("true") {
        return Ok(true);
    }
    Ok(element.attribute("role").await?.as_deref() == Some("textbox"))
}

/// Whether `element` can receive typed text.
pub async fn is_valid_input(element: &dyn Element) -> DomResult<bool> {
    match element.tag_name().await?.as_str() {
        "textarea" => return Ok(true),
        "input" => {
            let kind = element.input_type().await?.unwrap_or_else(|| "text".to_string());
            if TEXT_INPUT_TYPES.contains(&kind.as_str()) {
                return Ok(true);
            }
        }
        _ => {}
    }
    is_content_target(element).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::MemoryDocument;

    #[tokio::test]
    async fn test_validity_predicate() {
        let doc = MemoryDocument::new("https://example.com");

        let textarea = doc.append("textarea");
        let text = doc.append("input");
        let email = doc.append("input");
        email.set_attribute("type", "email");
        let checkbox = doc.append("input");
        checkbox.set_attribute("type", "checkbox");
        let editable = doc.append("div");
        editable.make_content_editable();
        let textbox = doc.append("div");
        textbox.set_attribute("role", "textbox");
        let plain = doc.append("div");

        assert!(is_valid_input(textarea.as_ref()).await.unwrap());
        assert!(is_valid_input(text.as_ref()).await.unwrap());
        assert!(is_valid_input(email.as_ref()).await.unwrap());
        assert!(!is_valid_input(checkbox.as_ref()).await.unwrap());
        assert!(is_valid_input(editable.as_ref()).await.unwrap());
        assert!(is_valid_input(textbox.as_ref()).await.unwrap());
        assert!(!is_valid_input(plain.as_ref()).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_mode_classification() {
        let doc = MemoryDocument::new("https://example.com");
        let textarea = doc.append("textarea");
        let inherited = doc.append("p");
        inherited.inherit_content_editable();
        let textbox = doc.append("div");
        textbox.set_attribute("role", "textbox");

        assert_eq!(InsertMode::of(textarea.as_ref()).await.unwrap(), InsertMode::Value);
        assert_eq!(InsertMode::of(inherited.as_ref()).await.unwrap(), InsertMode::Content);
        assert_eq!(InsertMode::of(textbox.as_ref()).await.unwrap(), InsertMode::Content);
    }
}
