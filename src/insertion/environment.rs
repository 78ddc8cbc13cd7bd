use serde::{Deserialize, Serialize};

use crate::dom::EnvironmentMarkers;

/// Component framework detected on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    Plain,
    React,
    Vue,
    Angular,
}

/// Capabilities of a page, computed once when an engine is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentProfile {
    pub framework: Framework,
    pub clipboard_access: bool,
    pub shadow_dom: bool,
}

impl EnvironmentProfile {
    pub fn from_markers(markers: &EnvironmentMarkers) -> Self {
        let framework = if markers.react {
            Framework::React
        } else if markers.vue {
            Framework::Vue
        } else if markers.angular {
            Framework::Angular
        } else {
            Framework::Plain
        };
        Self {
            framework,
            clipboard_access: markers.clipboard_access,
            shadow_dom: markers.shadow_dom,
        }
    }

    pub fn plain() -> Self {
        Self::default()
    }

    pub fn with_framework(mut self, framework: Framework) -> Self {
        self.framework = framework;
        self
    }

    pub fn with_clipboard(mut self) -> Self {
        self.clipboard_access = true;
        self
    }
}
