//! Input Locator: finds the element the user most likely wants text inserted into.
//!
//! An ordered cascade where the first hit wins:
//! focused element (through shadow roots), site selector table,
//! selection-anchored contenteditable, `role="textbox"`, same-origin iframes.

pub mod sites;
pub mod target;

use crate::dom::{Document, DomResult, ElementRef};

pub use target::{is_valid_input, InputTarget, InsertMode};

#[derive(Debug, Default, Clone, Copy)]
pub struct InputLocator;

impl InputLocator {
    pub fn new() -> Self {
        Self
    }

    /// Best-guess editable target, or `None` when every step came up empty.
    ///
    /// Never fails: DOM errors inside a step make that step inapplicable.
    pub async fn locate(&self, document: &dyn Document) -> Option<InputTarget> {
        match self.focused(document).await {
            Ok(Some(element)) => return self.target(element, false).await,
            Ok(None) => {}
            Err(e) => tracing::debug!("Focused element lookup failed: {}", e),
        }

        match self.site_composer(document).await {
            Ok(Some(element)) => return self.target(element, false).await,
            Ok(None) => {}
            Err(e) => tracing::debug!("Site selector lookup failed: {}", e),
        }

        match self.selection_host(document).await {
            Ok(Some(element)) => return self.target(element, false).await,
            Ok(None) => {}
            Err(e) => tracing::debug!("Selection anchor lookup failed: {}", e),
        }

        match document.query_selector(r#"[role="textbox"]"#).await {
            Ok(Some(element)) => return self.target(element, false).await,
            Ok(None) => {}
            Err(e) => tracing::debug!("ARIA textbox lookup failed: {}", e),
        }

        match self.frame_input(document).await {
            Ok(Some(element)) => return self.target(element, true).await,
            Ok(None) => {}
            Err(e) => tracing::debug!("Frame scan failed: {}", e),
        }

        tracing::debug!("No input target found");
        None
    }

    async fn target(&self, element: ElementRef, in_iframe: bool) -> Option<InputTarget> {
        match InputTarget::new(element, in_iframe).await {
            Ok(target) => {
                tracing::debug!("Located input target {:?}", target);
                Some(target)
            }
            Err(e) => {
                tracing::debug!("Located element could not be classified: {}", e);
                None
            }
        }
    }

    /// The active element, descending into open shadow roots, if it is a valid input
    async fn focused(&self, document: &dyn Document) -> DomResult<Option<ElementRef>> {
        let Some(mut element) = document.active_element().await? else {
            return Ok(None);
        };
        while let Some(inner) = element.shadow_active_element().await? {
            element = inner;
        }
        if is_valid_input(element.as_ref()).await? {
            Ok(Some(element))
        } else {
            Ok(None)
        }
    }

    async fn site_composer(&self, document: &dyn Document) -> DomResult<Option<ElementRef>> {
        let hostname = document.hostname().await?;
        for selector in sites::selectors_for(&hostname) {
            if let Some(element) = document.query_selector(selector).await? {
                tracing::debug!("Site selector '{}' matched on {}", selector, hostname);
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn selection_host(&self, document: &dyn Document) -> DomResult<Option<ElementRef>> {
        if !document.has_selection_anchor().await? {
            return Ok(None);
        }
        for element in document
            .query_selector_all(r#"[contenteditable="true"]"#)
            .await?
        {
            if document.selection_anchor_within(element.as_ref()).await? {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn frame_input(&self, document: &dyn Document) -> DomResult<Option<ElementRef>> {
        for frame in document.frames().await? {
            let frame = match frame {
                Ok(frame) => frame,
                Err(denied) => {
                    tracing::trace!("{}", denied);
                    continue;
                }
            };
            match self.focused(frame.as_ref()).await {
                Ok(Some(element)) => return Ok(Some(element)),
                Ok(None) => {}
                Err(e) => tracing::debug!("Frame active element lookup failed: {}", e),
            }
        }
        Ok(None)
    }
}
