/*!
common/src/lib.rs

Shared configuration types for the tech news agent.

This file provides:
- `Config`, the validated settings handed to every component at construction
- `FileConfig`, the optional TOML layer (deserialized from config.toml)
- A loader that merges built-in defaults, the TOML file and environment variables
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Every Monday at 09:00.
pub const DEFAULT_CRON_SCHEDULE: &str = "0 9 * * 1";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_NEWS_ARTICLES: usize = 20;
pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_CATEGORIES: [&str; 3] = ["technology", "science", "business"];

/// Errors raised while loading or validating configuration. All of them are
/// fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// `[news]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub max_articles: Option<usize>,
    pub categories: Option<Vec<String>>,
}

/// `[gemini]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_url: Option<String>,
}

/// `[telegram]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<i64>,
    pub api_url: Option<String>,
}

/// `[scheduler]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Five-field cron expression, e.g. "0 9 * * 1"
    pub cron: Option<String>,
}

/// Optional file layer (deserialized from config.toml). Every key may be
/// omitted; environment variables take precedence over anything set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl FileConfig {
    /// Load the file layer from a TOML file asynchronously.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let display = path.as_ref().display().to_string();
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|source| ConfigError::Read {
                path: display.clone(),
                source,
            })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }
}

/// Process-wide settings. Built once at startup, then passed by reference into
/// each component constructor and never mutated.
#[derive(Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_url: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id: i64,
    pub telegram_api_url: String,
    pub news_api_key: String,
    pub news_api_url: String,
    pub cron_schedule: String,
    pub max_news_articles: usize,
    pub news_categories: Vec<String>,
}

impl Config {
    /// Load configuration from the optional TOML file and the process
    /// environment, then validate it.
    ///
    /// Example:
    ///   let cfg = Config::load(Some(Path::new("config.toml"))).await?;
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let cfg = Self::load_unvalidated(path).await?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Same layering as `load` without the required-settings check, for
    /// modes that only talk to one service.
    pub async fn load_unvalidated(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => FileConfig::from_file(p).await?,
            None => FileConfig::default(),
        };
        Self::merge(file, |key| std::env::var(key).ok())
    }

    /// Merge defaults, the file layer and an environment lookup, then
    /// validate. Empty environment values count as unset.
    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cfg = Self::merge(file, env)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn merge<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let telegram_chat_id = match var("TELEGRAM_CHAT_ID") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|e| ConfigError::Invalid {
                    key: "TELEGRAM_CHAT_ID",
                    reason: format!("{:?} is not an integer ({})", raw, e),
                })?,
            None => file.telegram.chat_id.unwrap_or(0),
        };

        // Unparsable values fall back rather than abort startup.
        let max_news_articles = var("MAX_NEWS_ARTICLES")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .or(file.news.max_articles)
            .unwrap_or(DEFAULT_MAX_NEWS_ARTICLES);

        let news_categories = file
            .news
            .categories
            .unwrap_or_else(|| DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect());

        let cfg = Config {
            gemini_api_key: var("GEMINI_API_KEY")
                .or(file.gemini.api_key)
                .unwrap_or_default(),
            gemini_model: var("GEMINI_MODEL")
                .or(file.gemini.model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_url: var("GEMINI_API_URL")
                .or(file.gemini.api_url)
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            telegram_bot_token: var("TELEGRAM_BOT_TOKEN")
                .or(file.telegram.bot_token)
                .unwrap_or_default(),
            telegram_chat_id,
            telegram_api_url: var("TELEGRAM_API_URL")
                .or(file.telegram.api_url)
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            news_api_key: var("NEWS_API_KEY")
                .or(file.news.api_key)
                .unwrap_or_default(),
            news_api_url: var("NEWS_API_URL")
                .or(file.news.api_url)
                .unwrap_or_else(|| DEFAULT_NEWS_API_URL.to_string()),
            cron_schedule: var("CRON_SCHEDULE")
                .or(file.scheduler.cron)
                .unwrap_or_else(|| DEFAULT_CRON_SCHEDULE.to_string()),
            max_news_articles,
            news_categories,
        };

        Ok(cfg)
    }

    /// Check only what the Gemini provider needs.
    pub fn validate_gemini(&self) -> Result<(), ConfigError> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(ConfigError::Missing("GEMINI_API_KEY"));
        }
        Ok(())
    }

    /// Check that every required setting is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_gemini()?;
        if self.telegram_bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN"));
        }
        if self.telegram_chat_id == 0 {
            return Err(ConfigError::Missing("TELEGRAM_CHAT_ID"));
        }
        if self.news_api_key.trim().is_empty() {
            return Err(ConfigError::Missing("NEWS_API_KEY"));
        }
        if self.max_news_articles == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_NEWS_ARTICLES",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.news_categories.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                key: "news.categories",
                reason: "at least one category is required".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_url", &self.gemini_api_url)
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("news_api_key", &"<redacted>")
            .field("news_api_url", &self.news_api_url)
            .field("cron_schedule", &self.cron_schedule)
            .field("max_news_articles", &self.max_news_articles)
            .field("news_categories", &self.news_categories)
            .finish()
    }
}
