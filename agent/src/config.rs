//! Agent configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::PipelineOptions;
use crate::scheduler::SchedulerConfig;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Control API host address
    pub host: String,
    /// Control API port
    pub port: u16,
    /// SQLite connection URL
    pub database_url: String,
    /// Backend base URL, without trailing slash
    pub api_base_url: String,
    pub serial_directory_url: String,
    /// Static bearer token for the backend
    pub auth_token: Option<String>,
    /// Bearer token required by the control API, if set
    pub control_api_token: Option<String>,
    pub serial_sync_interval: Duration,
    pub upload_interval: Duration,
    pub serial_stream_cooldown: Duration,
    pub upload_stream_cooldown: Duration,
    pub event_stagger: Duration,
    pub max_accounts_per_pass: usize,
    pub account_concurrency: usize,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
    pub retry_delay: Duration,
}

fn var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = var("API_BASE_URL")
            .ok_or(ConfigError::Missing("API_BASE_URL"))?
            .trim_end_matches('/')
            .to_string();

        let serial_directory_url = var("SERIAL_DIRECTORY_URL")
            .unwrap_or_else(|| format!("{}/api/unused-meter-serials", api_base_url));

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or("PORT", 7878)?,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:fieldsync.db?mode=rwc".to_string()),
            api_base_url,
            serial_directory_url,
            auth_token: var("AUTH_TOKEN"),
            control_api_token: var("CONTROL_API_TOKEN"),
            serial_sync_interval: Duration::from_secs(parse_or("SERIAL_SYNC_INTERVAL_SECS", 30)?),
            upload_interval: Duration::from_secs(parse_or("UPLOAD_INTERVAL_SECS", 300)?),
            serial_stream_cooldown: Duration::from_secs(parse_or(
                "SERIAL_STREAM_COOLDOWN_SECS",
                10,
            )?),
            upload_stream_cooldown: Duration::from_secs(parse_or(
                "UPLOAD_STREAM_COOLDOWN_SECS",
                60,
            )?),
            event_stagger: Duration::from_millis(parse_or("EVENT_STAGGER_MS", 1500)?),
            max_accounts_per_pass: parse_or(
                "MAX_ACCOUNTS_PER_PASS",
                PipelineOptions::DEFAULT_MAX_ACCOUNTS,
            )?,
            account_concurrency: parse_or(
                "ACCOUNT_CONCURRENCY",
                PipelineOptions::DEFAULT_CONCURRENCY,
            )?,
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 15)?),
            upload_timeout: Duration::from_secs(parse_or("UPLOAD_TIMEOUT_SECS", 60)?),
            retry_delay: Duration::from_millis(parse_or("RETRY_DELAY_MS", 2000)?),
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_accounts_per_pass: self.max_accounts_per_pass.max(1),
            account_concurrency: self.account_concurrency.max(1),
            ..PipelineOptions::with_retry_delay(self.retry_delay.as_millis() as u64)
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            serial_interval: self.serial_sync_interval,
            upload_interval: self.upload_interval,
            serial_cooldown_ms: self.serial_stream_cooldown.as_millis() as u64,
            upload_cooldown_ms: self.upload_stream_cooldown.as_millis() as u64,
            event_stagger: self.event_stagger,
        }
    }
}

/// Configuration errors.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid {0} value")]
    Invalid(&'static str),
}
