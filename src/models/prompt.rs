use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::variable::VariableSpec;

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// A saved reusable prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub is_pinned: bool,
    /// Derived from `content`; user overrides survive edits by name
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub usage_count: u64,
    pub last_used: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub source_url: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl PromptRecord {
    pub fn has_variables(&self) -> bool {
        !self.variables.is_empty()
    }

    /// Case-insensitive match over title, content and tags
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.content.to_lowercase().contains(&term)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&term))
    }
}

/// Fields accepted when saving a new prompt; id and timestamps are assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDraft {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
}

impl PromptDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_pinned: Option<bool>,
    #[serde(default)]
    pub variables: Option<Vec<VariableSpec>>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Derive a display title from the first line of content.
pub fn title_from_content(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or_default();
    if first_line.chars().count() > 50 {
        let head: String = first_line.chars().take(47).collect();
        format!("{}...", head)
    } else {
        first_line.to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    #[default]
    Quick,
    Detailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub save_mode: SaveMode,
    /// "auto", "en", "zh_CN"
    #[serde(default = "default_auto")]
    pub language: String,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default)]
    pub shortcut_conflict_resolved: bool,
    /// "auto", "light", "dark"
    #[serde(default = "default_auto")]
    pub theme: String,
}

fn default_auto() -> String {
    "auto".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_mode: SaveMode::Quick,
            language: default_auto(),
            default_category: default_category(),
            shortcut_conflict_resolved: false,
            theme: default_auto(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub save_mode: Option<SaveMode>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub default_category: Option<String>,
    #[serde(default)]
    pub shortcut_conflict_resolved: Option<bool>,
    #[serde(default)]
    pub theme: Option<String>,
}

impl Settings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(mode) = patch.save_mode {
            self.save_mode = mode;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        if let Some(category) = patch.default_category {
            self.default_category = category;
        }
        if let Some(resolved) = patch.shortcut_conflict_resolved {
            self.shortcut_conflict_resolved = resolved;
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
    }
}
