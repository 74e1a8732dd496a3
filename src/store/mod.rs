//! Cache store backends for the metrics data.
//!
//! This module provides a trait-based store with two implementations:
//! - in-memory (via `memory` module), used by tests and local runs
//! - Redis (via `redis_store` module, feature `cache-redis`)
//!
//! Reads are single round trips. Writes made by the refresh jobs are queued as
//! [`WriteCommand`]s and sent together through [`CacheStore::execute_pipeline`].

use crate::metrics::error::MetricsError;
use async_trait::async_trait;
use std::collections::HashMap;

pub mod memory;

#[cfg(feature = "cache-redis")]
pub mod redis_store;

pub use memory::MemoryStore;

#[cfg(feature = "cache-redis")]
pub use redis_store::RedisStore;

/// A queued write. Both variants overwrite, so replaying a command is harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCommand {
    /// `SET key value`
    Set { key: String, value: u64 },
    /// `HSET key field value`
    HashSet {
        key: String,
        field: String,
        value: u64,
    },
}

impl WriteCommand {
    pub fn set(key: impl Into<String>, value: u64) -> Self {
        WriteCommand::Set {
            key: key.into(),
            value,
        }
    }

    pub fn hash_set(key: impl Into<String>, field: impl Into<String>, value: u64) -> Self {
        WriteCommand::HashSet {
            key: key.into(),
            field: field.into(),
            value,
        }
    }
}

/// Trait defining the cache store interface
///
/// Implementations must be thread-safe (Send + Sync): the same store is shared
/// by all providers and by concurrent requests.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a plain value. Missing keys are `None`, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>, MetricsError>;

    /// Overwrites a plain integer value.
    async fn set(&self, key: &str, value: u64) -> Result<(), MetricsError>;

    /// Reads one field of a hash. Missing keys or fields are `None`.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, MetricsError>;

    /// Reads a whole hash. A missing key is an empty map.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, MetricsError>;

    /// Overwrites one integer field of a hash.
    async fn hash_set(&self, key: &str, field: &str, value: u64) -> Result<(), MetricsError>;

    /// Returns every key matching a glob pattern (`*` and `?` wildcards),
    /// each key once.
    ///
    /// A failure at any point of the scan is an error; a partial key list is
    /// never returned.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, MetricsError>;

    /// Sends all commands in one round trip.
    ///
    /// This is for throughput only: if it fails, any prefix of the commands
    /// may already have been applied.
    async fn execute_pipeline(&self, commands: &[WriteCommand]) -> Result<(), MetricsError>;
}

/// Parses a stored counter, treating a missing value as zero.
pub fn parse_count(value: Option<&str>) -> Result<u64, MetricsError> {
    match value {
        Some(value) => Ok(value.trim().parse::<u64>()?),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_count_defaults_to_zero() {
        assert_eq!(parse_count(None).unwrap(), 0);
        assert_eq!(parse_count(Some("123")).unwrap(), 123);
    }

    #[test]
    fn parse_count_rejects_garbage() {
        match parse_count(Some("twelve")) {
            Err(MetricsError::ParseInt(_)) => (),
            other => panic!("Expected ParseInt error, got {other:?}"),
        }
    }
}
