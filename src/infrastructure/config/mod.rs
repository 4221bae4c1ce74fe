//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::moderation::EscalationPolicy;
use crate::application::resources::ResourceLimits;
use crate::domain::entities::ReconnectPolicy;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub connection: ConnectionConfig,
    pub moderation: ModerationConfig,
    pub resources: ResourcesConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
    /// Owner identity; commands marked owner-only accept only this sender
    pub owner: String,
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConnectionConfig {
    pub max_reconnect_attempts: u32,
    pub initial_backoff_ms: u64,
    /// Optional ceiling for a single reconnect delay
    pub max_backoff_ms: Option<u64>,
    pub auth_failure_code: u16,
    pub auth_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ModerationConfig {
    pub enabled: bool,
    pub violation_ttl_ms: u64,
    pub mute_threshold: u32,
    pub remove_threshold: u32,
    pub sweep_interval_ms: u64,
    /// Extra exact phrases treated as spam
    pub spam_phrases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResourcesConfig {
    pub memory_threshold_mb: f64,
    pub low_memory_concurrency: usize,
    pub default_concurrency: usize,
    pub disk_threshold_percent: u8,
    pub disk_path: PathBuf,
    pub cache_dir: PathBuf,
    pub cache_max_age_days: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdaptersConfig {
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub chat_id: String,
    pub sender_id: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "stiletto-bot".to_string(),
            prefix: ".".to_string(),
            owner: String::new(),
            debug: false,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            initial_backoff_ms: 5_000,
            max_backoff_ms: None,
            auth_failure_code: 401,
            auth_dir: PathBuf::from("auth"),
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            violation_ttl_ms: 86_400_000,
            mute_threshold: 2,
            remove_threshold: 3,
            sweep_interval_ms: 60_000,
            spam_phrases: Vec::new(),
        }
    }
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            memory_threshold_mb: 500.0,
            low_memory_concurrency: 1,
            default_concurrency: 4,
            disk_threshold_percent: 80,
            disk_path: PathBuf::from("/"),
            cache_dir: PathBuf::from("./cache"),
            cache_max_age_days: 7,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chat_id: "console@s.whatsapp.net".to_string(),
            sender_id: "console@s.whatsapp.net".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults with environment overrides applied
    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// `BOT_PREFIX` and `BOT_OWNER_ID` override the file values.
    pub fn apply_env(&mut self) {
        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }

        if let Ok(owner) = std::env::var("BOT_OWNER_ID") {
            self.bot.owner = owner;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.is_empty() {
            return Err(ConfigError::MissingField("bot.prefix".to_string()));
        }
        if self.connection.max_reconnect_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "connection.max-reconnect-attempts must be at least 1".to_string(),
            ));
        }
        if self.moderation.mute_threshold == 0 {
            return Err(ConfigError::InvalidValue(
                "moderation.mute-threshold must be at least 1".to_string(),
            ));
        }
        if self.moderation.remove_threshold <= self.moderation.mute_threshold {
            return Err(ConfigError::InvalidValue(format!(
                "moderation.remove-threshold ({}) must exceed mute-threshold ({})",
                self.moderation.remove_threshold, self.moderation.mute_threshold
            )));
        }
        if self.moderation.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "moderation.sweep-interval-ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.connection.max_reconnect_attempts,
            initial_backoff: Duration::from_millis(self.connection.initial_backoff_ms),
            max_backoff: self.connection.max_backoff_ms.map(Duration::from_millis),
            auth_failure_code: self.connection.auth_failure_code,
        }
    }

    pub fn escalation_policy(&self) -> EscalationPolicy {
        EscalationPolicy {
            mute_at: self.moderation.mute_threshold,
            remove_at: self.moderation.remove_threshold,
        }
    }

    pub fn violation_ttl(&self) -> Duration {
        Duration::from_millis(self.moderation.violation_ttl_ms)
    }

    pub fn resource_limits(&self) -> ResourceLimits {
        let r = &self.resources;
        ResourceLimits {
            memory_threshold_mb: r.memory_threshold_mb,
            low_memory_concurrency: r.low_memory_concurrency,
            default_concurrency: r.default_concurrency,
            disk_threshold_percent: r.disk_threshold_percent,
            disk_path: r.disk_path.clone(),
            cache_dir: r.cache_dir.clone(),
            cache_max_age: Duration::from_secs(r.cache_max_age_days * 24 * 60 * 60),
        }
    }
}
