//! Worker configuration read from the environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use catalog_slides::application::dispatcher::DispatcherConfig;

use crate::error::AppError;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DISPATCH_INTERVAL_MS: u64 = 5_000;
const DEFAULT_DISPATCH_BATCH_SIZE: usize = 10;

/// Settings for one worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// `PostgreSQL` connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Pool size (`DATABASE_MAX_CONNECTIONS`).
    pub max_connections: u32,
    /// Tick interval (`DISPATCH_INTERVAL_MS`) and batch size
    /// (`DISPATCH_BATCH_SIZE`).
    pub dispatcher: DispatcherConfig,
}

impl WorkerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is unset or a numeric
    /// variable is not a positive integer.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".into())
            })?;

        let max_connections =
            positive(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let interval_ms = positive(&lookup, "DISPATCH_INTERVAL_MS", DEFAULT_DISPATCH_INTERVAL_MS)?;
        let batch_size = positive(&lookup, "DISPATCH_BATCH_SIZE", DEFAULT_DISPATCH_BATCH_SIZE)?;

        Ok(Self {
            database_url,
            max_connections,
            dispatcher: DispatcherConfig {
                interval: Duration::from_millis(interval_ms),
                batch_size,
            },
        })
    }
}

/// Parses an optional variable that must be a non-zero integer.
fn positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    let value: T = raw
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key} must be a positive integer: {e}")))?;
    if value == T::default() {
        return Err(AppError::Config(format!("{key} must be greater than zero")));
    }
    Ok(value)
}
