use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config as cfg;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ColorTable, RoomType, ScaleConfig};

/// Prefix for environment overrides, e.g. `CHATPULSE__SLACK__TOKEN`.
pub const ENV_PREFIX: &str = "CHATPULSE";

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "SlackConfig::default_api_base")]
    pub api_base: String,
    /// Falls back to the `SLACK_TOKEN` environment variable.
    #[serde(default, skip_serializing)]
    pub token: Option<SecretString>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SlackConfig {
    fn default_api_base() -> String {
        "https://slack.com/api".to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: Self::default_api_base(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,
    /// Name of the graph resource updated every cycle.
    #[serde(default = "StoreConfig::default_graph_name")]
    pub graph_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl StoreConfig {
    fn default_api_base() -> String {
        "http://localhost:3000/v2".to_string()
    }

    fn default_graph_name() -> String {
        "slack-demo".to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_base: Self::default_api_base(),
            email: String::new(),
            password: None,
            graph_name: Self::default_graph_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Time between sampling cycles (default: 1h)
    #[serde(default = "ScheduleConfig::default_interval")]
    pub interval_secs: u64,

    /// How far back message history is counted (default: 24h)
    #[serde(default = "ScheduleConfig::default_lookback")]
    pub lookback_secs: u64,

    /// Stop after this long; 0 runs until interrupted (default: 24h)
    #[serde(default = "ScheduleConfig::default_run_for")]
    pub run_for_secs: u64,
}

impl ScheduleConfig {
    fn default_interval() -> u64 {
        60 * 60
    }

    fn default_lookback() -> u64 {
        60 * 60 * 24
    }

    fn default_run_for() -> u64 {
        60 * 60 * 24
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_secs)
    }

    pub fn run_for(&self) -> Option<Duration> {
        (self.run_for_secs > 0).then(|| Duration::from_secs(self.run_for_secs))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval(),
            lookback_secs: Self::default_lookback(),
            run_for_secs: Self::default_run_for(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    fn default_format() -> String {
        "pretty".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: Self::default_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub scale: ScaleConfig,
    /// Rooms to sample and their color bands.
    #[serde(default)]
    pub rooms: ColorTable,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            slack: SlackConfig::default(),
            store: StoreConfig::default(),
            schedule: ScheduleConfig::default(),
            scale: ScaleConfig::default(),
            rooms: ColorTable::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

impl Settings {
    pub fn default_env() -> String {
        env::var("CHATPULSE_ENV")
            .ok()
            .or_else(|| env::var("APP_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.slack.api_base.trim().is_empty() {
            return invalid("slack.api_base cannot be empty".into());
        }
        if self.store.api_base.trim().is_empty() {
            return invalid("store.api_base cannot be empty".into());
        }
        if self.store.graph_name.trim().is_empty() {
            return invalid("store.graph_name cannot be empty".into());
        }
        if self.schedule.interval_secs == 0 {
            return invalid("schedule.interval_secs must be > 0".into());
        }
        let scale = &self.scale;
        if !(scale.min_size.is_finite() && scale.max_size.is_finite())
            || scale.min_size >= scale.max_size
        {
            return invalid(format!(
                "scale range [{}, {}] must be finite with min < max",
                scale.min_size, scale.max_size
            ));
        }
        if !(scale.exponent.is_finite() && scale.exponent > 0.0) {
            return invalid(format!("scale.exponent must be > 0, got {}", scale.exponent));
        }
        for room_type in RoomType::ALL {
            for (name, bands) in self.rooms.rooms(room_type) {
                for (metric, band) in bands.bands() {
                    if band.low > band.high {
                        return invalid(format!(
                            "rooms.{}.{}.{}: low {} exceeds high {}",
                            room_type, name, metric, band.low, band.high
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn tracked_room_count(&self) -> usize {
        RoomType::ALL
            .iter()
            .map(|t| self.rooms.rooms(*t).len())
            .sum()
    }

    /// Get the default configuration directory.
    ///
    /// Priority order:
    /// 1. ~/.chatpulse/
    /// 2. ./config/
    /// 3. Current directory
    pub fn default_config_dir() -> PathBuf {
        if let Some(home_dir) = dirs::home_dir() {
            let user_dir = home_dir.join(".chatpulse");
            if user_dir.exists() {
                return user_dir;
            }
        }

        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_config = cwd.join("config");
        if project_config.exists() {
            return project_config;
        }
        cwd
    }

    /// Layered load: default, `{env}`, local, then `CHATPULSE__*` variables.
    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        let builder = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.yaml")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.yaml", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(cfg::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let mut settings: Settings = builder
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        settings.env = env_name.to_string();

        if settings.slack.token.is_none() {
            settings.slack.token = env::var("SLACK_TOKEN").ok().map(SecretString::from);
        }
        Ok(settings)
    }

    /// Resolves the config directory and environment, loads and validates.
    pub fn load(config_dir: Option<PathBuf>, env_name: Option<String>) -> Result<Settings> {
        let config_dir = config_dir.unwrap_or_else(Self::default_config_dir);
        let env_name = env_name.unwrap_or_else(Self::default_env);
        let settings = Self::load_from_sources(&config_dir, &env_name)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Writes the starter configuration to `path` unless it already exists.
    pub fn write_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {:?}", parent))?;
        }
        fs::write(path, DEFAULT_CONFIG).with_context(|| format!("writing {:?}", path))?;
        Ok(true)
    }
}
