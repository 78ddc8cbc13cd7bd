use serde::{Deserialize, Serialize};

use crate::variables::format_name;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    Text,
    Number,
    Options,
}

/// One fillable field derived from a `[name]` placeholder.
///
/// Always owned by (and serialized within) a `PromptRecord`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariableSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: VariableType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default: String,
    /// Allowed values when `kind` is `Options`
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_required() -> bool {
    true
}

fn default_step() -> f64 {
    1.0
}

impl VariableSpec {
    /// Spec synthesized the first time a placeholder name is seen
    pub fn with_defaults(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            placeholder: format!("Enter {}", format_name(&name)),
            name,
            kind: VariableType::Text,
            required: true,
            example: String::new(),
            description: String::new(),
            default: String::new(),
            options: Vec::new(),
            min: None,
            max: None,
            step: 1.0,
        }
    }

    pub fn number(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.kind = VariableType::Number;
        self.min = min;
        self.max = max;
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind = VariableType::Options;
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}
