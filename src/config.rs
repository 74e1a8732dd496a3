//! Process configuration.
//!
//! Built once by whoever starts the process and passed to the providers.

use std::str::FromStr;

use crate::metrics::batch::DEFAULT_BATCH_SIZE;
use crate::metrics::error::MetricsError;

pub const DEFAULT_GCP_PROJECT_NAME: &str = "elife-data-pipeline";
pub const DEFAULT_NUMBER_OF_DAYS: u32 = 3;
pub const DEFAULT_NUMBER_OF_MONTHS: u32 = 3;

/// Settings of the refresh jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Rows per pipelined batch.
    pub batch_size: usize,
    /// Trailing window of the daily refresh.
    pub number_of_days: u32,
    /// Trailing window of the monthly refresh.
    pub number_of_months: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            number_of_days: DEFAULT_NUMBER_OF_DAYS,
            number_of_months: DEFAULT_NUMBER_OF_MONTHS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub redis_host: String,
    pub redis_port: u16,
    pub gcp_project_name: String,
    pub bigquery_access_token: Option<String>,
    pub refresh: RefreshConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_host: "localhost".to_owned(),
            redis_port: 6379,
            gcp_project_name: DEFAULT_GCP_PROJECT_NAME.to_owned(),
            bigquery_access_token: None,
            refresh: RefreshConfig::default(),
        }
    }
}

impl Config {
    /// Reads the configuration from the environment, loading a `.env` file
    /// first if there is one.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `REDIS_HOST` | `localhost` |
    /// | `REDIS_PORT` | `6379` |
    /// | `GCP_PROJECT_NAME` | `elife-data-pipeline` |
    /// | `BIGQUERY_ACCESS_TOKEN` | none |
    /// | `REFRESH_BATCH_SIZE` | `1000` |
    /// | `REFRESH_NUMBER_OF_DAYS` | `3` |
    /// | `REFRESH_NUMBER_OF_MONTHS` | `3` |
    pub fn from_env() -> Result<Self, MetricsError> {
        Self::from_lookup(|name| dotenvy::var(name).ok())
    }

    /// Like [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MetricsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let config = Config {
            redis_host: lookup("REDIS_HOST").unwrap_or(defaults.redis_host),
            redis_port: parse_var(&lookup, "REDIS_PORT", defaults.redis_port)?,
            gcp_project_name: lookup("GCP_PROJECT_NAME").unwrap_or(defaults.gcp_project_name),
            bigquery_access_token: lookup("BIGQUERY_ACCESS_TOKEN"),
            refresh: RefreshConfig {
                batch_size: parse_var(&lookup, "REFRESH_BATCH_SIZE", defaults.refresh.batch_size)?,
                number_of_days: parse_var(
                    &lookup,
                    "REFRESH_NUMBER_OF_DAYS",
                    defaults.refresh.number_of_days,
                )?,
                number_of_months: parse_var(
                    &lookup,
                    "REFRESH_NUMBER_OF_MONTHS",
                    defaults.refresh.number_of_months,
                )?,
            },
        };

        if config.refresh.batch_size == 0 {
            return Err(MetricsError::Configuration(
                "REFRESH_BATCH_SIZE must be at least 1".to_owned(),
            ));
        }
        Ok(config)
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, MetricsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| MetricsError::Configuration(format!("{name} is not a valid number: {raw}"))),
    }
}
