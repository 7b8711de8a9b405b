//! Configuration types and loading.
//!
//! Config is loaded from an optional JSON file (e.g. `~/.recicla/config.json`) and then
//! overridden by the environment (`PORT`, `TELEGRAM_BOT_TOKEN`, `TELEGRAM_API_BASE`,
//! `RECICLA_IA_ENDPOINT`). The result is resolved once at startup into [`Settings`].

use crate::classifier::StatusPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_PORT: &str = "PORT";
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_API_BASE: &str = "TELEGRAM_API_BASE";
pub const ENV_CLASSIFIER_ENDPOINT: &str = "RECICLA_IA_ENDPOINT";
pub const ENV_CONFIG_PATH: &str = "RECICLA_CONFIG_PATH";

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Image classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Limits for downloaded Telegram files.
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Listener bind address and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the webhook listener (default 3000). Overridden by PORT env.
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; Telegram must be able to reach the webhook).
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    3000
}

fn default_server_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// Telegram bot config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Bot API base URL (default https://api.telegram.org). Overridden by TELEGRAM_API_BASE env.
    pub api_base: Option<String>,
    /// Public URL of this service. When set, `serve` registers it with setWebhook on startup and removes it on shutdown.
    pub webhook_url: Option<String>,
}

/// Classifier endpoint config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// URL the image bytes are POSTed to. Overridden by RECICLA_IA_ENDPOINT env.
    pub endpoint: Option<String>,
    /// Client timeout for the classify call, in seconds (default 10).
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,
    /// What to do with a non-2xx classifier response: "decode" (default) or "reject".
    #[serde(default)]
    pub on_http_error: StatusPolicy,
}

fn default_classifier_timeout_secs() -> u64 {
    10
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_classifier_timeout_secs(),
            on_http_error: StatusPolicy::default(),
        }
    }
}

/// Download limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadConfig {
    /// Largest file accepted from Telegram, in bytes (default 20 MiB, the Bot API download limit).
    #[serde(default = "default_max_download_bytes")]
    pub max_bytes: u64,
}

fn default_max_download_bytes() -> u64 {
    20 * 1024 * 1024
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_download_bytes(),
        }
    }
}

/// Resolved, immutable settings handed to the gateway. Built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub port: u16,
    pub bot_token: String,
    pub telegram_api_base: String,
    pub webhook_url: Option<String>,
    pub classifier_endpoint: String,
    pub classifier_timeout: Duration,
    pub status_policy: StatusPolicy,
    pub max_download_bytes: u64,
}

impl Settings {
    /// Resolve settings from config and the process environment.
    pub fn resolve(config: &Config) -> Result<Self> {
        Self::resolve_with(config, process_env)
    }

    /// Resolve settings from config and an arbitrary variable lookup (env overrides config).
    pub fn resolve_with<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let port = match env(ENV_PORT) {
            Some(p) => p
                .parse::<u16>()
                .with_context(|| format!("invalid {}: {}", ENV_PORT, p))?,
            None => config.server.port,
        };

        let bot_token = telegram_token_with(config, &env).ok_or_else(|| {
            anyhow::anyhow!("telegram.botToken or {} is required", ENV_BOT_TOKEN)
        })?;
        let telegram_api_base = telegram_api_base_with(config, &env);

        let classifier_endpoint = env(ENV_CLASSIFIER_ENDPOINT)
            .or_else(|| non_empty(config.classifier.endpoint.as_deref()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "classifier.endpoint or {} is required",
                    ENV_CLASSIFIER_ENDPOINT
                )
            })?;

        if config.classifier.timeout_secs == 0 {
            anyhow::bail!("classifier.timeoutSecs must be greater than zero");
        }

        Ok(Self {
            bind: config.server.bind.trim().to_string(),
            port,
            bot_token,
            telegram_api_base,
            webhook_url: non_empty(config.telegram.webhook_url.as_deref()),
            classifier_endpoint,
            classifier_timeout: Duration::from_secs(config.classifier.timeout_secs),
            status_policy: config.classifier.on_http_error,
            max_download_bytes: config.download.max_bytes,
        })
    }

    /// `bind:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    telegram_token_with(config, &process_env)
}

/// Resolve the Bot API base URL: env TELEGRAM_API_BASE overrides config, then the public API.
pub fn resolve_telegram_api_base(config: &Config) -> String {
    telegram_api_base_with(config, &process_env)
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn telegram_token_with(config: &Config, env: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    env(ENV_BOT_TOKEN).or_else(|| non_empty(config.telegram.bot_token.as_deref()))
}

fn telegram_api_base_with(config: &Config, env: &dyn Fn(&str) -> Option<String>) -> String {
    env(ENV_API_BASE)
        .or_else(|| non_empty(config.telegram.api_base.as_deref()))
        .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH).map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".recicla").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or RECICLA_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
