use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::insertion::{EngineConfig, DEFAULT_CLIPBOARD_RESTORE_MS, DEFAULT_TYPING_DELAY_MS};

const APP_DIR: &str = "com.promptpal.app";
const DB_FILE: &str = "prompts.db";
const DEFAULT_BRIDGE_SETTLE_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub data_dir: PathBuf,
    /// Page to open at startup; without one the browser is launched on request
    pub start_url: Option<String>,
    pub headless: bool,
    pub typing_delay: Duration,
    pub clipboard_restore_delay: Duration,
    /// Wait after injecting the page bridge before pinging it again
    pub bridge_settle: Duration,
}

fn env_millis(name: &str, default: u64) -> Duration {
    Duration::from_millis(
        env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8765),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            data_dir: env::var("PROMPTPAL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
            start_url: env::var("PROMPTPAL_START_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            headless: env::var("PROMPTPAL_HEADLESS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            typing_delay: env_millis("PROMPTPAL_TYPING_DELAY_MS", DEFAULT_TYPING_DELAY_MS),
            clipboard_restore_delay: env_millis(
                "PROMPTPAL_CLIPBOARD_RESTORE_MS",
                DEFAULT_CLIPBOARD_RESTORE_MS,
            ),
            bridge_settle: env_millis("PROMPTPAL_BRIDGE_SETTLE_MS", DEFAULT_BRIDGE_SETTLE_MS),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_typing_delay(self.typing_delay)
            .with_clipboard_restore_delay(self.clipboard_restore_delay)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8765,
            host: "127.0.0.1".to_string(),
            data_dir: default_data_dir(),
            start_url: None,
            headless: false,
            typing_delay: Duration::from_millis(DEFAULT_TYPING_DELAY_MS),
            clipboard_restore_delay: Duration::from_millis(DEFAULT_CLIPBOARD_RESTORE_MS),
            bridge_settle: Duration::from_millis(DEFAULT_BRIDGE_SETTLE_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8765);
        assert_eq!(config.typing_delay, Duration::from_millis(5));
        assert_eq!(config.bridge_settle, Duration::from_millis(200));
        assert!(config.db_path().ends_with("com.promptpal.app/prompts.db"));
        assert_eq!(config.engine_config().max_nesting, 5);
    }
}
