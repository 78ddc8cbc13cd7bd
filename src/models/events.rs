use serde::Serialize;

use super::prompt::PromptRecord;
use super::responses::{SelectorItem, VariableForm};
use crate::insertion::StrategyKind;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

/// User feedback pushed to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackEvent {
    Toast {
        level: ToastLevel,
        message: String,
    },
    InsertionCompleted {
        prompt_id: Option<String>,
        strategy: StrategyKind,
    },
    InsertionFailed {
        prompt_id: Option<String>,
    },
    SelectorOpened {
        items: Vec<SelectorItem>,
        selected_index: i64,
    },
    SelectorUpdated {
        items: Vec<SelectorItem>,
        selected_index: i64,
    },
    SelectorClosed,
    VariableFormOpened {
        form: VariableForm,
    },
    PromptSaved {
        prompt: PromptRecord,
    },
    Pong,
}

impl FeedbackEvent {
    pub fn toast(level: ToastLevel, message: impl Into<String>) -> Self {
        FeedbackEvent::Toast {
            level,
            message: message.into(),
        }
    }
}
