use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";
pub const API_BASE_URL_ENV: &str = "TELEGRAM_API_BASE_URL";
pub const STATE_DIR_ENV: &str = "TGBRIDGE_STATE_DIR";

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tgbridge.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Normally supplied through TELEGRAM_BOT_TOKEN instead of the file.
    #[serde(default)]
    pub bot_token: String,
    /// Chat used when a send call names none.
    #[serde(default)]
    pub default_chat_id: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".tgbridge")
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            default_chat_id: None,
            api_base_url: default_api_base_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl StorageConfig {
    /// File holding the update cursor.
    pub fn cursor_path(&self) -> PathBuf {
        self.state_dir.join("offset")
    }

    /// Directory attachments are downloaded into.
    pub fn downloads_dir(&self) -> PathBuf {
        self.state_dir.join("downloads")
    }
}

impl Config {
    /// Load from `path` (or `tgbridge.toml` if present), then apply
    /// environment overrides from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(TOKEN_ENV) {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = non_empty(CHAT_ID_ENV) {
            self.telegram.default_chat_id = Some(chat_id);
        }
        if let Some(url) = non_empty(API_BASE_URL_ENV) {
            self.telegram.api_base_url = url;
        }
        if let Some(dir) = non_empty(STATE_DIR_ENV) {
            self.storage.state_dir = PathBuf::from(dir);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!(
                "{} is not set; a bot token is required to start",
                TOKEN_ENV
            );
        }
        Ok(())
    }
}
