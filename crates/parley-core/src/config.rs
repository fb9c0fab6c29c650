use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

/// Telegram rejects messages longer than 4096 characters.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 4090;
pub const DEFAULT_HISTORY_MAX_SIZE: usize = 2048;
pub const DEFAULT_EDIT_INTERVAL_MS: u64 = 1000;
/// Bot API download limit for `getFile`.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

/// Top-level config (parley.toml + PARLEY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Deny-by-default allowlist: `"*"`, usernames (with or without `@`)
    /// or numeric user IDs.
    #[serde(default)]
    pub allow_users: Vec<String>,
    /// When true, direct messages are accepted.
    #[serde(default = "bool_true")]
    pub dm_allowed: bool,
    /// Replied-to photos larger than this are not forwarded.
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allow_users: Vec::new(),
            dm_allowed: true,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

/// Unit in which `history.max_size` is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryUnit {
    #[default]
    Tokens,
    Chars,
    Entries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_max_size")]
    pub max_size: usize,
    #[serde(default)]
    pub unit: HistoryUnit,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_HISTORY_MAX_SIZE,
            unit: HistoryUnit::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Minimum gap between two intermediate edits of the same message.
    #[serde(default = "default_edit_interval_ms")]
    pub edit_interval_ms: u64,
    /// Raw text appended to the terminal render; escaped like any reply text.
    #[serde(default = "default_completion_marker")]
    pub completion_marker: String,
    /// Raw text of the message sent before the first delta arrives.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl RenderConfig {
    pub fn edit_interval(&self) -> Duration {
        Duration::from_millis(self.edit_interval_ms)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            edit_interval_ms: DEFAULT_EDIT_INTERVAL_MS,
            completion_marker: default_completion_marker(),
            placeholder: default_placeholder(),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_max_attachment_bytes() -> u64 {
    DEFAULT_MAX_ATTACHMENT_BYTES
}
fn default_history_max_size() -> usize {
    DEFAULT_HISTORY_MAX_SIZE
}
fn default_edit_interval_ms() -> u64 {
    DEFAULT_EDIT_INTERVAL_MS
}
fn default_completion_marker() -> String {
    "\u{2705}".to_string() // ✅
}
fn default_placeholder() -> String {
    "\u{2026}".to_string() // …
}
fn default_max_message_len() -> usize {
    DEFAULT_MAX_MESSAGE_LEN
}

impl ParleyConfig {
    /// Load config from a TOML file with PARLEY_* env var overrides.
    ///
    /// Nested keys use a double underscore: `PARLEY_TELEGRAM__BOT_TOKEN`.
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ParleyConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PARLEY_").split("__"))
            .extract()
            .map_err(|e| ParleyError::Config(e.to_string()))?;

        config.validate()?;
        tracing::debug!(path = %path, "config loaded");
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.history.max_size == 0 {
            return Err(ParleyError::InvalidValue {
                field: "history.max_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.render.max_message_len == 0
            || self.render.max_message_len > TELEGRAM_MESSAGE_LIMIT
        {
            return Err(ParleyError::InvalidValue {
                field: "render.max_message_len",
                reason: format!("must be between 1 and {TELEGRAM_MESSAGE_LIMIT}"),
            });
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parley/parley.toml", home)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_original_bot() {
        let config = ParleyConfig::default();
        assert_eq!(config.history.max_size, 2048);
        assert_eq!(config.history.unit, HistoryUnit::Tokens);
        assert_eq!(config.render.max_message_len, 4090);
        assert!(config.telegram.dm_allowed);
        assert!(config.telegram.allow_users.is_empty());
        assert_eq!(config.telegram.max_attachment_bytes, 20 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reads_toml_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[telegram]
bot_token = "123:abc"
allow_users = ["alice", "42"]

[history]
max_size = 10
unit = "entries"

[render]
edit_interval_ms = 250
"#
        )
        .unwrap();

        let config = ParleyConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.allow_users, vec!["alice", "42"]);
        assert_eq!(config.history.max_size, 10);
        assert_eq!(config.history.unit, HistoryUnit::Entries);
        assert_eq!(config.render.edit_interval(), Duration::from_millis(250));
        assert_eq!(config.render.completion_marker, "\u{2705}");
    }

    #[test]
    fn load_rejects_zero_history() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[history]\nmax_size = 0").unwrap();

        let err = ParleyConfig::load(file.path().to_str()).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG_VALUE");
    }

    #[test]
    fn oversized_message_limit_is_invalid() {
        let mut config = ParleyConfig::default();
        config.render.max_message_len = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[history]\nmax_size = \"lots\"").unwrap();

        let err = ParleyConfig::load(file.path().to_str()).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
