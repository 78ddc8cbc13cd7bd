//! Prompt library storage.

pub mod repository;

use thiserror::Error;

use crate::models::{PromptDraft, PromptPatch, PromptRecord, Settings, SettingsPatch};

pub use repository::PromptRepository;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Prompt {0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage backend for prompts and settings.
pub trait PromptStore: Send + Sync {
    fn get_all_prompts(&self) -> StoreResult<Vec<PromptRecord>>;

    fn get_prompt(&self, id: &str) -> StoreResult<PromptRecord>;

    /// Assigns id and timestamps, derives title and variables
    fn save_prompt(&self, draft: PromptDraft) -> StoreResult<PromptRecord>;

    fn update_prompt(&self, id: &str, patch: PromptPatch) -> StoreResult<PromptRecord>;

    fn delete_prompt(&self, id: &str) -> StoreResult<()>;

    fn increment_usage(&self, id: &str) -> StoreResult<PromptRecord>;

    fn toggle_pin(&self, id: &str) -> StoreResult<PromptRecord>;

    fn get_settings(&self) -> StoreResult<Settings>;

    fn update_settings(&self, patch: SettingsPatch) -> StoreResult<Settings>;

    /// Most recently used first
    fn recent_prompts(&self, limit: usize) -> StoreResult<Vec<PromptRecord>> {
        let mut prompts = self.get_all_prompts()?;
        prompts.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        prompts.truncate(limit);
        Ok(prompts)
    }

    fn pinned_prompts(&self) -> StoreResult<Vec<PromptRecord>> {
        Ok(self
            .get_all_prompts()?
            .into_iter()
            .filter(|p| p.is_pinned)
            .collect())
    }
}
