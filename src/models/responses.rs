use serde::{Deserialize, Serialize};

use super::prompt::PromptRecord;
use super::variable::VariableSpec;
use crate::insertion::StrategyKind;
use crate::variables::FieldError;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub browser_attached: bool,
}

#[derive(Debug, Serialize)]
pub struct GenericResponse {
    pub status: String,
}

/// Fill-in form for a prompt with placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariableForm {
    pub prompt_id: String,
    pub title: String,
    pub fields: Vec<VariableSpec>,
    /// Content with hints substituted in
    pub preview: String,
}

/// One row of the prompt selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectorItem {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub is_pinned: bool,
    pub has_variables: bool,
}

const SNIPPET_CHARS: usize = 100;

impl From<&PromptRecord> for SelectorItem {
    fn from(prompt: &PromptRecord) -> Self {
        let mut snippet: String = prompt.content.chars().take(SNIPPET_CHARS).collect();
        if prompt.content.chars().count() > SNIPPET_CHARS {
            snippet.push_str("...");
        }
        Self {
            id: prompt.id.clone(),
            title: prompt.title.clone(),
            snippet,
            is_pinned: prompt.is_pinned,
            has_variables: prompt.has_variables(),
        }
    }
}

/// Reply on the messaging channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Vec<PromptRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<VariableForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SelectorItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(code: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code.to_string()),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn with_prompts(mut self, prompts: Vec<PromptRecord>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn with_prompt(mut self, prompt: PromptRecord) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_form(mut self, form: VariableForm) -> Self {
        self.form = Some(form);
        self
    }

    pub fn with_items(mut self, items: Vec<SelectorItem>, selected_index: i64) -> Self {
        self.items = Some(items);
        self.selected_index = Some(selected_index);
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = Some(errors);
        self
    }
}
