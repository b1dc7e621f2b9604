//! Process configuration, read from the environment (and `.env`, if present).

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::coordinator::{DEFAULT_OBJECT_SIZE, DEFAULT_WRITE_TIMEOUT};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BUCKET_NAME environment variable not set")]
    MissingBucket,
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bucket_name: String,
    pub port: u16,
    pub object_size: usize,
    pub write_timeout: Duration,
    pub endpoint_url: Option<String>,
    pub log_level: Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bucket_name = get("BUCKET_NAME").ok_or(ConfigError::MissingBucket)?;
        let port = parse(&get, "PORT")?.unwrap_or(DEFAULT_PORT);
        let object_size = parse(&get, "OBJECT_SIZE")?.unwrap_or(DEFAULT_OBJECT_SIZE);
        let write_timeout = parse(&get, "WRITE_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_WRITE_TIMEOUT);
        let log_level = parse(&get, "LOG_LEVEL")?.unwrap_or(Level::INFO);

        Ok(Self {
            bucket_name,
            port,
            object_size,
            write_timeout,
            endpoint_url: get("S3_ENDPOINT_URL"),
            log_level,
        })
    }
}

fn parse<T, F>(get: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}
