use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_API_VERSION: u32 = 58;
pub const DEFAULT_SWEEP_SCHEDULE: &str = "*/15 * * * * *";
const TEST_MODE_SWEEP_SCHEDULE: &str = "*/5 * * * * *";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub salesforce_api_version: u32,
    pub http_timeout_secs: u64,
    pub bind_addr: SocketAddr,
    pub sweep_schedule: String,
    pub sweep_batch_size: i64,
    pub scheduler_test_mode: bool,
    pub shutdown_grace_secs: u64,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let scheduler_test_mode = parse_or(&lookup, "JOB_SCHEDULER_TEST_MODE", false)?;
        let default_schedule = if scheduler_test_mode {
            TEST_MODE_SWEEP_SCHEDULE
        } else {
            DEFAULT_SWEEP_SCHEDULE
        };

        let sweep_batch_size: i64 = parse_or(&lookup, "SCHEMA_SWEEP_BATCH_SIZE", 5)?;
        if sweep_batch_size < 1 {
            return Err(ConfigError::Invalid {
                key: "SCHEMA_SWEEP_BATCH_SIZE",
                value: sweep_batch_size.to_string(),
            });
        }

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            salesforce_api_version: parse_or(&lookup, "SALESFORCE_API_VERSION", DEFAULT_API_VERSION)?,
            http_timeout_secs: parse_or(&lookup, "SALESFORCE_HTTP_TIMEOUT_SECS", 60)?,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            sweep_schedule: lookup("SCHEMA_SWEEP_SCHEDULE")
                .unwrap_or_else(|| default_schedule.to_string()),
            sweep_batch_size,
            scheduler_test_mode,
            shutdown_grace_secs: parse_or(&lookup, "SHUTDOWN_GRACE_SECS", 120)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
