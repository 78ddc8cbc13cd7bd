use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DomError, DomResult};

/// Text clipboard shared with the rest of the system.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn read_text(&self) -> DomResult<String>;

    async fn write_text(&self, text: &str) -> DomResult<()>;
}

/// The operating system clipboard.
///
/// A fresh `arboard::Clipboard` is opened per call on the blocking pool since
/// the handle must not be shared across threads on every platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn read_text(&self) -> DomResult<String> {
        tokio::task::spawn_blocking(|| {
            let mut clipboard =
                arboard::Clipboard::new().map_err(|e| DomError::Clipboard(e.to_string()))?;
            clipboard
                .get_text()
                .map_err(|e| DomError::Clipboard(e.to_string()))
        })
        .await
        .map_err(|e| DomError::Clipboard(e.to_string()))?
    }

    async fn write_text(&self, text: &str) -> DomResult<()> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            let mut clipboard =
                arboard::Clipboard::new().map_err(|e| DomError::Clipboard(e.to_string()))?;
            clipboard
                .set_text(text)
                .map_err(|e| DomError::Clipboard(e.to_string()))
        })
        .await
        .map_err(|e| DomError::Clipboard(e.to_string()))?
    }
}

/// In-process clipboard with a write history.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    state: Mutex<ClipboardState>,
}

#[derive(Debug, Default)]
struct ClipboardState {
    text: String,
    writes: Vec<String>,
    unreadable: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        let clipboard = Self::default();
        clipboard.state.lock().text = text.into();
        clipboard
    }

    /// Reads fail, as they do without clipboard-read permission
    pub fn deny_reads(&self) {
        self.state.lock().unreadable = true;
    }

    pub fn contents(&self) -> String {
        self.state.lock().text.clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.lock().writes.clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn read_text(&self) -> DomResult<String> {
        let state = self.state.lock();
        if state.unreadable {
            return Err(DomError::Clipboard("read permission denied".to_string()));
        }
        Ok(state.text.clone())
    }

    async fn write_text(&self, text: &str) -> DomResult<()> {
        let mut state = self.state.lock();
        state.text = text.to_string();
        state.writes.push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard_history_and_denied_reads() {
        let clipboard = MemoryClipboard::with_text("before");
        tokio_test::block_on(async {
            assert_eq!(clipboard.read_text().await.unwrap(), "before");
            clipboard.write_text("after").await.unwrap();
            clipboard.deny_reads();
            assert!(matches!(clipboard.read_text().await, Err(DomError::Clipboard(_))));
        });
        assert_eq!(clipboard.contents(), "after");
        assert_eq!(clipboard.writes(), vec!["after"]);
    }
}
