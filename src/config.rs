use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub bot_token: Option<String>,
    pub bot_username: String,
    pub media_base_url: Option<String>,
    pub send_timeout: Duration,
    pub queue_capacity: usize,
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool_size: u32,
    pub notify: NotifyConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&get, "PORT", 8080)?,
            pool_size: parsed(&get, "DB_POOL_SIZE", 10)?,
            notify: NotifyConfig {
                bot_token: get("BOT_TOKEN"),
                bot_username: get("BOT_USERNAME")
                    .map(|u| u.trim_start_matches('@').to_string())
                    .unwrap_or_else(|| "marketplace_bot".to_string()),
                media_base_url: get("MEDIA_BASE_URL"),
                send_timeout: Duration::from_secs(parsed(&get, "NOTIFY_TIMEOUT_SECS", 5)?),
                queue_capacity: parsed(&get, "NOTIFY_QUEUE_CAPACITY", 256)?,
                concurrency: parsed(&get, "NOTIFY_CONCURRENCY", 8)?,
            },
        })
    }

    pub fn require_bot_token(&self) -> Result<&str, ConfigError> {
        self.notify
            .bot_token
            .as_deref()
            .ok_or(ConfigError::Missing("BOT_TOKEN"))
    }
}

fn parsed<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
