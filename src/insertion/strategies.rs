//! Text insertion strategies.
//!
//! Each strategy is one technique for writing text into a target and
//! notifying the host page. Strategies report `Ok(false)` when they do not
//! apply; [`InsertStrategy::try_apply`] turns errors into `false` as well.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::dom::{splice_utf16, utf16_len, Clipboard, DomEvent, DomResult, Element};
use crate::locator::InsertMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Standard,
    #[serde(rename = "framework-native-setter")]
    NativeSetter,
    #[serde(rename = "component-internal-write")]
    ComponentWrite,
    SimulatedTyping,
    ClipboardPaste,
    #[serde(rename = "mutation-observer-bypass")]
    ObserverBypass,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Standard => "standard",
            StrategyKind::NativeSetter => "framework-native-setter",
            StrategyKind::ComponentWrite => "component-internal-write",
            StrategyKind::SimulatedTyping => "simulated-typing",
            StrategyKind::ClipboardPaste => "clipboard-paste",
            StrategyKind::ObserverBypass => "mutation-observer-bypass",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[async_trait]
pub trait InsertStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Write `text` into `element`. `Ok(false)` means not applicable.
    async fn apply(&self, element: &dyn Element, mode: InsertMode, text: &str) -> DomResult<bool>;

    async fn try_apply(&self, element: &dyn Element, mode: InsertMode, text: &str) -> bool {
        match self.apply(element, mode, text).await {
            Ok(applied) => applied,
            Err(e) => {
                tracing::debug!("Strategy {} failed on {}: {}", self.name(), element.id(), e);
                false
            }
        }
    }
}

async fn dispatch_all(element: &dyn Element, events: &[DomEvent]) -> DomResult<()> {
    for event in events {
        element.dispatch(event).await?;
    }
    Ok(())
}

/// Plain assignment spliced at the caret, or a range replacement for content hosts.
#[derive(Debug, Default)]
pub struct StandardStrategy;

#[async_trait]
impl InsertStrategy for StandardStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Standard
    }

    async fn apply(&self, element: &dyn Element, mode: InsertMode, text: &str) -> DomResult<bool> {
        match mode {
            InsertMode::Value => {
                let (start, end) = element.selection_range().await?;
                let current = element.value().await?;
                element
                    .set_value(&splice_utf16(&current, start, end, text))
                    .await?;
                let caret = start.min(utf16_len(&current)) + utf16_len(text);
                // Some input types reject selection APIs
                if let Err(e) = element.set_selection_range(caret, caret).await {
                    tracing::trace!("Caret not restored: {}", e);
                }
                dispatch_all(element, &[DomEvent::Input, DomEvent::Change]).await?;
            }
            InsertMode::Content => {
                element.focus().await?;
                element.replace_selection(text).await?;
                element.dispatch(&DomEvent::Input).await?;
            }
        }
        Ok(true)
    }
}

/// Write through the prototype's own `value` setter.
#[derive(Debug, Default)]
pub struct NativeSetterStrategy;

#[async_trait]
impl InsertStrategy for NativeSetterStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NativeSetter
    }

    async fn apply(&self, element: &dyn Element, mode: InsertMode, text: &str) -> DomResult<bool> {
        if mode != InsertMode::Value {
            return Ok(false);
        }
        element.set_value_native(text).await?;
        dispatch_all(
            element,
            &[DomEvent::Input, DomEvent::Change, DomEvent::Blur, DomEvent::Focus],
        )
        .await?;
        Ok(true)
    }
}

/// Assignment on elements that carry a component instance back-reference.
#[derive(Debug, Default)]
pub struct ComponentWriteStrategy;

#[async_trait]
impl InsertStrategy for ComponentWriteStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ComponentWrite
    }

    async fn apply(&self, element: &dyn Element, mode: InsertMode, text: &str) -> DomResult<bool> {
        if mode != InsertMode::Value || !element.has_component_instance().await? {
            return Ok(false);
        }
        element.set_value(text).await?;
        dispatch_all(element, &[DomEvent::Input, DomEvent::Change, DomEvent::Blur]).await?;
        Ok(true)
    }
}

/// One character at a time with key events around each.
#[derive(Debug)]
pub struct SimulatedTypingStrategy {
    delay: Duration,
}

impl SimulatedTypingStrategy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl InsertStrategy for SimulatedTypingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SimulatedTyping
    }

    async fn apply(&self, element: &dyn Element, mode: InsertMode, text: &str) -> DomResult<bool> {
        element.focus().await?;
        element.select_all().await?;
        if mode == InsertMode::Value {
            element.set_value("").await?;
        }

        let mut buf = [0u8; 4];
        for ch in text.chars() {
            let key = ch.to_string();
            element.dispatch(&DomEvent::KeyDown(key.clone())).await?;
            match mode {
                InsertMode::Value => {
                    let current = element.value().await?;
                    let (start, end) = element.selection_range().await?;
                    element
                        .set_value(&splice_utf16(&current, start, end, ch.encode_utf8(&mut buf)))
                        .await?;
                }
                InsertMode::Content => {
                    if !element.insert_text_command(&key).await? {
                        element.replace_selection(&key).await?;
                    }
                }
            }
            element.dispatch(&DomEvent::Input).await?;
            element.dispatch(&DomEvent::KeyUp(key)).await?;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        element.dispatch(&DomEvent::Change).await?;
        Ok(true)
    }
}

/// Paste from the clipboard, restoring its previous text afterwards.
pub struct ClipboardPasteStrategy {
    clipboard: Arc<dyn Clipboard>,
    enabled: bool,
    restore_delay: Duration,
}

impl ClipboardPasteStrategy {
    pub fn new(clipboard: Arc<dyn Clipboard>, enabled: bool, restore_delay: Duration) -> Self {
        Self {
            clipboard,
            enabled,
            restore_delay,
        }
    }
}

#[async_trait]
impl InsertStrategy for ClipboardPasteStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ClipboardPaste
    }

    async fn apply(&self, element: &dyn Element, _mode: InsertMode, text: &str) -> DomResult<bool> {
        if !self.enabled {
            return Ok(false);
        }

        let previous = match self.clipboard.read_text().await {
            Ok(previous) => previous,
            Err(e) => {
                tracing::debug!("Clipboard snapshot unavailable: {}", e);
                String::new()
            }
        };
        self.clipboard.write_text(text).await?;

        let pasted: DomResult<()> = async {
            element.focus().await?;
            element.select_all().await?;
            if !element.paste_command().await? {
                element.dispatch(&DomEvent::Paste).await?;
            }
            element.dispatch(&DomEvent::Input).await
        }
        .await;

        // Restoration races with any copy the user makes before it fires
        if !previous.is_empty() {
            let clipboard = Arc::clone(&self.clipboard);
            let delay = self.restore_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = clipboard.write_text(&previous).await {
                    tracing::debug!("Clipboard restore failed: {}", e);
                }
            });
        }
        pasted.map(|()| true)
    }
}

/// Native write and a full event batch with mutation observers stubbed out.
#[derive(Debug, Default)]
pub struct ObserverBypassStrategy;

impl ObserverBypassStrategy {
    async fn write(&self, element: &dyn Element, mode: InsertMode, text: &str) -> DomResult<()> {
        match mode {
            InsertMode::Value => element.set_value_native(text).await?,
            InsertMode::Content => {
                element.focus().await?;
                element.select_all().await?;
                element.replace_selection(text).await?;
            }
        }
        let key = text.chars().last().map(String::from).unwrap_or_default();
        dispatch_all(
            element,
            &[
                DomEvent::KeyDown(key.clone()),
                DomEvent::KeyPress(key.clone()),
                DomEvent::Input,
                DomEvent::Change,
                DomEvent::KeyUp(key),
                DomEvent::Blur,
                DomEvent::Focus,
            ],
        )
        .await
    }
}

#[async_trait]
impl InsertStrategy for ObserverBypassStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ObserverBypass
    }

    async fn apply(&self, element: &dyn Element, mode: InsertMode, text: &str) -> DomResult<bool> {
        element.suspend_mutation_observers().await?;
        let written = self.write(element, mode, text).await;
        let restored = element.restore_mutation_observers().await;
        written?;
        restored?;
        Ok(true)
    }
}
