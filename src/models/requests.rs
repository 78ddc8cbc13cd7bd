use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::prompt::{PromptDraft, PromptRecord};

/// Request on the messaging channel, tagged by `action`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Message {
    Ping,
    GetPrompts,
    SavePrompt {
        data: PromptDraft,
    },
    InsertPrompt {
        text: String,
        #[serde(rename = "promptId", default)]
        prompt_id: Option<String>,
    },
    /// Shows the variable form when the prompt has placeholders
    InsertStructuredPrompt {
        prompt: PromptRecord,
    },
    SubmitVariables {
        #[serde(rename = "promptId")]
        prompt_id: String,
        #[serde(default)]
        values: HashMap<String, String>,
    },
    GetSelection,
    /// Capture the page selection as a new prompt
    SaveSelection,
    ShowFloatingUi,
    SelectorSearch {
        query: String,
    },
    SelectorKey {
        key: String,
    },
    /// Pointer selection of a listed item
    SelectorSelect {
        index: usize,
    },
}

impl Message {
    pub fn action(&self) -> &'static str {
        match self {
            Message::Ping => "ping",
            Message::GetPrompts => "get_prompts",
            Message::SavePrompt { .. } => "save_prompt",
            Message::InsertPrompt { .. } => "insert_prompt",
            Message::InsertStructuredPrompt { .. } => "insert_structured_prompt",
            Message::SubmitVariables { .. } => "submit_variables",
            Message::GetSelection => "get_selection",
            Message::SaveSelection => "save_selection",
            Message::ShowFloatingUi => "show_floating_ui",
            Message::SelectorSearch { .. } => "selector_search",
            Message::SelectorKey { .. } => "selector_key",
            Message::SelectorSelect { .. } => "selector_select",
        }
    }
}

/// Query for `GET /prompts`
#[derive(Debug, Default, Deserialize)]
pub struct PromptListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

/// Query for `GET /prompts/recent`
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: usize,
}

fn default_recent_limit() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct OpenPageRequest {
    pub url: String,
    #[serde(default)]
    pub headless: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_use_wire_names() {
        let msg: Message =
            serde_json::from_str(r#"{"action":"insert_prompt","text":"hi","promptId":"p1"}"#).unwrap();
        match msg {
            Message::InsertPrompt { text, prompt_id } => {
                assert_eq!(text, "hi");
                assert_eq!(prompt_id.as_deref(), Some("p1"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let msg: Message = serde_json::from_str(r#"{"action":"show_floating_ui"}"#).unwrap();
        assert_eq!(msg.action(), "show_floating_ui");

        let msg: Message = serde_json::from_str(
            r#"{"action":"submit_variables","promptId":"p1","values":{"topic":"rust"}}"#,
        )
        .unwrap();
        assert_eq!(msg.action(), "submit_variables");
    }
}
