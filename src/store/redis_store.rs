//! Redis backend implementation for the metrics cache store

use crate::metrics::error::MetricsError;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;

use super::{CacheStore, WriteCommand};

/// Keys requested per `SCAN` round trip.
const SCAN_COUNT: usize = 1000;

/// Drives a cursor scan to completion.
///
/// `scan_page` runs one `SCAN` from the given cursor and returns the next
/// cursor with the keys of that round trip. The scan ends when the cursor is
/// back to 0. Any failed round trip fails the whole scan. Keys returned more
/// than once, as `SCAN` may do while the server rehashes, are kept once.
async fn scan_all<F, Fut>(mut scan_page: F) -> Result<Vec<String>, MetricsError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<(u64, Vec<String>), MetricsError>>,
{
    let mut keys = BTreeSet::new();
    let mut cursor = 0;
    loop {
        let (next_cursor, page) = scan_page(cursor).await?;
        keys.extend(page);
        if next_cursor == 0 {
            return Ok(keys.into_iter().collect());
        }
        cursor = next_cursor;
    }
}

/// Redis-based cache store
///
/// Holds one multiplexed connection. Cloning the connection is cheap and every
/// call works on its own clone, so the store can be shared across tasks.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Create a new Redis store from a connection URL
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Example
    /// ```ignore
    /// let store = RedisStore::from_url("redis://localhost:6379").await?;
    /// ```
    pub async fn from_url(url: &str) -> Result<Self, MetricsError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        log::info!("Connected to redis at {url}");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, MetricsError> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: u64) -> Result<(), MetricsError> {
        let mut connection = self.connection.clone();
        let _: () = connection.set(key, value).await?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, MetricsError> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.hget(key, field).await?;
        Ok(value)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, MetricsError> {
        let mut connection = self.connection.clone();
        let hash: HashMap<String, String> = connection.hgetall(key).await?;
        Ok(hash)
    }

    async fn hash_set(&self, key: &str, field: &str, value: u64) -> Result<(), MetricsError> {
        let mut connection = self.connection.clone();
        let _: () = connection.hset(key, field, value).await?;
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, MetricsError> {
        let keys = scan_all(|cursor| {
            let mut connection = self.connection.clone();
            async move {
                let page: (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .query_async(&mut connection)
                    .await?;
                Ok(page)
            }
        })
        .await?;

        log::debug!("Scanned {} keys matching {pattern}", keys.len());
        Ok(keys)
    }

    async fn execute_pipeline(&self, commands: &[WriteCommand]) -> Result<(), MetricsError> {
        if commands.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for command in commands {
            match command {
                WriteCommand::Set { key, value } => {
                    pipe.set(key, *value).ignore();
                }
                WriteCommand::HashSet { key, field, value } => {
                    pipe.hset(key, field, *value).ignore();
                }
            }
        }

        let mut connection = self.connection.clone();
        let _: () = pipe.query_async(&mut connection).await?;
        Ok(())
    }
}
