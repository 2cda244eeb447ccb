//! Run configuration.
//!
//! [`Config`] is built once in `main` from the parsed [`Cli`] plus an
//! optional YAML [`Settings`] file, then passed by reference to every stage.
//! Nothing reads the environment after startup.

use crate::cli::Cli;
use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_COMPLETION_URL: &str = "https://api.longcat.chat/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "LongCat-Flash-Chat";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Keywords an item must mention to be considered.
pub const DEFAULT_KEYWORDS: [&str; 9] = [
    "科技", "计算机", "网络", "技术", "系统", "AI", "人工智能", "芯片", "软件",
];

/// Tunables that may be overridden from the settings file.
///
/// Every field has a default, so an empty file (or none at all) reproduces
/// the stock behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub keywords: Vec<String>,
    pub completion: CompletionSettings,
    pub feed: FeedSettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Extra attempts after a failed call. Zero disables retrying.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// No timeout when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            completion: CompletionSettings::default(),
            feed: FeedSettings::default(),
            upload: UploadSettings::default(),
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_COMPLETION_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.7,
            timeout_secs: 60,
            max_retries: 0,
            retry_base_delay_ms: 1000,
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML text. `path` is only used in error messages.
    pub fn parse(text: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::ParseSettings {
            path: path.to_string(),
            source,
        })
    }

    /// Read and parse a YAML settings file.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the file, as given by `--config`
    ///
    /// # Returns
    ///
    /// The settings, with defaults for every key the file leaves out, or
    /// [`ConfigError::ReadSettings`] / [`ConfigError::ParseSettings`].
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadSettings {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&text, path)
    }
}

/// Completion endpoint settings with the API key attached.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: usize,
    pub retry_base_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub url: String,
    pub token: String,
    pub timeout: Option<Duration>,
}

/// Immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    pub completion: CompletionConfig,
    pub upload: UploadConfig,
    pub keywords: Vec<String>,
    pub dry_run: bool,
}

impl Config {
    /// Validate CLI/env input and merge in the optional settings file.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let settings = match cli.config.as_deref() {
            Some(path) => {
                info!(path, "Loading settings file");
                Settings::load(path)?
            }
            None => Settings::default(),
        };
        Self::build(cli, settings)
    }

    fn build(cli: &Cli, settings: Settings) -> Result<Self, ConfigError> {
        let api_key = required(cli.meituan_api_key.as_deref(), "MEITUAN_API_KEY")?;
        let token = required(cli.upload_api_token.as_deref(), "UPLOAD_API_TOKEN")?;
        let rss_url = checked_url(&cli.rss_url, "RSS_URL")?;
        let upload_url = checked_url(&cli.upload_api_url, "UPLOAD_API_URL")?;
        let completion_url = checked_url(&settings.completion.url, "completion.url")?;

        let config = Config {
            feed: FeedConfig {
                url: rss_url,
                timeout: Duration::from_secs(settings.feed.timeout_secs),
                user_agent: settings.feed.user_agent,
            },
            completion: CompletionConfig {
                url: completion_url,
                api_key,
                model: settings.completion.model,
                max_tokens: settings.completion.max_tokens,
                temperature: settings.completion.temperature,
                timeout: Duration::from_secs(settings.completion.timeout_secs),
                max_retries: settings.completion.max_retries,
                retry_base_delay: Duration::from_millis(settings.completion.retry_base_delay_ms),
            },
            upload: UploadConfig {
                url: upload_url,
                token,
                timeout: settings.upload.timeout_secs.map(Duration::from_secs),
            },
            keywords: settings.keywords,
            dry_run: cli.dry_run,
        };
        debug!(
            feed = %config.feed.url,
            upload = %config.upload.url,
            model = %config.completion.model,
            keywords = config.keywords.len(),
            dry_run = config.dry_run,
            "Configuration resolved"
        );
        Ok(config)
    }
}

fn required(value: Option<&str>, name: &'static str) -> Result<String, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn checked_url(value: &str, name: &'static str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    Url::parse(trimmed).map_err(|source| ConfigError::InvalidUrl { name, source })?;
    Ok(trimmed.to_string())
}
