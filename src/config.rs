use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub env: AppEnv,
    pub port: u16,
    pub host: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub cache_ttl: Duration,
    pub scheduler: SchedulerConfig,
    pub outbound: OutboundConfig,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct OutboundConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub expect_status: u16,
    pub auth_header: Option<String>,
    pub auth_value: Option<String>,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|name| var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let env = Env { lookup: &lookup };

        let app_env = match env.get("APP_ENV").as_deref() {
            None | Some("dev") | Some("development") => AppEnv::Dev,
            Some("prod") | Some("production") => AppEnv::Prod,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "APP_ENV",
                    reason: format!("unknown environment {other}"),
                });
            }
        };

        let batch_size: usize = env.parse_or("SCHEDULER_BATCH_SIZE", 2)?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid {
                name: "SCHEDULER_BATCH_SIZE",
                reason: "must be positive".to_string(),
            });
        }
        let interval_secs: u64 = env.parse_or("SCHEDULER_INTERVAL_SECS", 120)?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SCHEDULER_INTERVAL_SECS",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Config {
            env: app_env,
            port: env.parse_or("PORT", 8080)?,
            host: env.get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            database_url: env.require("DATABASE_URL")?,
            database_max_connections: env.parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            redis_url: env.get("REDIS_URL"),
            cache_ttl: Duration::from_secs(env.parse_or("CACHE_TTL_SECS", 86_400)?),
            scheduler: SchedulerConfig {
                enabled: env.parse_or("SCHEDULER_ENABLED", true)?,
                interval: Duration::from_secs(interval_secs),
                batch_size,
            },
            outbound: OutboundConfig {
                url: env.require("OUTBOUND_URL")?,
                timeout: Duration::from_millis(env.parse_or("OUTBOUND_TIMEOUT_MS", 5_000)?),
                max_retries: env.parse_or("OUTBOUND_MAX_RETRIES", 3)?,
                retry_delay: Duration::from_millis(env.parse_or("OUTBOUND_RETRY_DELAY_MS", 200)?),
                expect_status: env.parse_or("OUTBOUND_EXPECT_STATUS", 202)?,
                auth_header: env.get("OUTBOUND_AUTH_HEADER"),
                auth_value: env.get("OUTBOUND_AUTH_VALUE"),
            },
        })
    }

    pub fn is_prod(&self) -> bool {
        self.env == AppEnv::Prod
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    /// Blank values count as unset.
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn require(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
                name,
                reason: format!("{raw:?}: {err}"),
            }),
        }
    }
}
