//! In-memory cache store
//!
//! Behaves like the Redis backend for the handful of commands the metrics code
//! uses, including WRONGTYPE errors when a hash command hits a plain value.
//! It also counts executed pipelines and can be told to start failing, which
//! is how refresh batching and partial-failure behaviour are tested.

use crate::metrics::error::MetricsError;
use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{CacheStore, WriteCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Value(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    pipeline_executions: AtomicUsize,
    fail_pipeline_after: RwLock<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pipelines executed successfully so far.
    pub fn pipeline_executions(&self) -> usize {
        self.pipeline_executions.load(Ordering::SeqCst)
    }

    /// Makes every pipeline after the first `successful` ones fail without
    /// applying any of its commands.
    pub fn fail_pipelines_after(&self, successful: usize) {
        *self.fail_pipeline_after.write() = Some(successful);
    }

    /// Returns a sorted list of all keys, for inspecting state in tests.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copies the whole key space, for comparing states in tests.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let entries = self.entries.read();
        let mut flat = Vec::new();
        for (key, entry) in entries.iter() {
            match entry {
                Entry::Value(value) => flat.push((key.clone(), value.clone())),
                Entry::Hash(hash) => {
                    flat.extend(
                        hash.iter()
                            .map(|(field, value)| (format!("{key}#{field}"), value.clone())),
                    );
                }
            }
        }
        flat.sort();
        flat
    }

    /// Stores a raw string value, bypassing the integer-only write API.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .write()
            .insert(key.to_owned(), Entry::Value(value.to_owned()));
    }

    fn apply(entries: &mut HashMap<String, Entry>, command: &WriteCommand) -> Result<(), MetricsError> {
        match command {
            WriteCommand::Set { key, value } => {
                entries.insert(key.clone(), Entry::Value(value.to_string()));
            }
            WriteCommand::HashSet { key, field, value } => {
                match entries
                    .entry(key.clone())
                    .or_insert_with(|| Entry::Hash(HashMap::new()))
                {
                    Entry::Hash(hash) => {
                        hash.insert(field.clone(), value.to_string());
                    }
                    Entry::Value(_) => return Err(wrong_type(key)),
                }
            }
        }
        Ok(())
    }
}

fn wrong_type(key: &str) -> MetricsError {
    MetricsError::Store(format!(
        "WRONGTYPE operation against key {key} holding the wrong kind of value"
    ))
}

/// Compiles a glob pattern (`*` and `?`) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex, MetricsError> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$"))
        .map_err(|e| MetricsError::Store(format!("invalid scan pattern {pattern}: {e}")))
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, MetricsError> {
        match self.entries.read().get(key) {
            None => Ok(None),
            Some(Entry::Value(value)) => Ok(Some(value.clone())),
            Some(Entry::Hash(_)) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: u64) -> Result<(), MetricsError> {
        Self::apply(&mut self.entries.write(), &WriteCommand::set(key, value))
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, MetricsError> {
        match self.entries.read().get(key) {
            None => Ok(None),
            Some(Entry::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(Entry::Value(_)) => Err(wrong_type(key)),
        }
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, MetricsError> {
        match self.entries.read().get(key) {
            None => Ok(HashMap::new()),
            Some(Entry::Hash(hash)) => Ok(hash.clone()),
            Some(Entry::Value(_)) => Err(wrong_type(key)),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: u64) -> Result<(), MetricsError> {
        Self::apply(
            &mut self.entries.write(),
            &WriteCommand::hash_set(key, field, value),
        )
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, MetricsError> {
        let regex = glob_to_regex(pattern)?;
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect())
    }

    async fn execute_pipeline(&self, commands: &[WriteCommand]) -> Result<(), MetricsError> {
        if let Some(successful) = *self.fail_pipeline_after.read() {
            if self.pipeline_executions() >= successful {
                return Err(MetricsError::Store("connection reset by peer".to_owned()));
            }
        }

        let mut entries = self.entries.write();
        for command in commands {
            Self::apply(&mut entries, command)?;
        }
        self.pipeline_executions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_values_are_empty() {
        let store = MemoryStore::new();

        assert_eq!(store.get("article:1:page_views").await.unwrap(), None);
        assert_eq!(store.hash_get("article:1:crossref_citations", "1").await.unwrap(), None);
        assert!(store.hash_get_all("article:1:page_views:by_date").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_overwrites() {
        let store = MemoryStore::new();
        store.set("article:1:page_views", 5).await.unwrap();
        store.set("article:1:page_views", 7).await.unwrap();

        assert_eq!(
            store.get("article:1:page_views").await.unwrap(),
            Some("7".to_owned())
        );
    }

    #[tokio::test]
    async fn hash_set_and_get() {
        let store = MemoryStore::new();
        store.hash_set("h", "2023-10-01", 5).await.unwrap();
        store.hash_set("h", "2023-10-02", 10).await.unwrap();

        assert_eq!(store.hash_get("h", "2023-10-02").await.unwrap(), Some("10".to_owned()));
        assert_eq!(store.hash_get_all("h").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn hash_commands_against_plain_value_fail() {
        let store = MemoryStore::new();
        store.set("k", 1).await.unwrap();

        assert!(store.hash_get_all("k").await.is_err());
        assert!(store.hash_set("k", "f", 1).await.is_err());
    }

    #[tokio::test]
    async fn scan_matches_glob() {
        let store = MemoryStore::new();
        store.set("article:1:page_views", 1).await.unwrap();
        store.set("article:2:page_views", 1).await.unwrap();
        store.set("article:2:downloads", 1).await.unwrap();
        store.hash_set("article:2:page_views:by_date", "2023-10-01", 1).await.unwrap();
        store.set("non-article:digest:1:page_views", 1).await.unwrap();

        let mut keys = store.scan_keys("article:*:page_views").await.unwrap();
        keys.sort();

        assert_eq!(keys, vec!["article:1:page_views", "article:2:page_views"]);
    }

    #[test]
    fn glob_escapes_regex_characters() {
        let regex = glob_to_regex("a.b?c*").unwrap();
        assert!(regex.is_match("a.bXc"));
        assert!(regex.is_match("a.bXcdef"));
        assert!(!regex.is_match("aXbXc"));
    }

    #[tokio::test]
    async fn pipeline_applies_all_commands_and_counts() {
        let store = MemoryStore::new();
        store
            .execute_pipeline(&[
                WriteCommand::set("a", 1),
                WriteCommand::hash_set("b", "f", 2),
            ])
            .await
            .unwrap();

        assert_eq!(store.pipeline_executions(), 1);
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_owned()));
        assert_eq!(store.hash_get("b", "f").await.unwrap(), Some("2".to_owned()));
    }

    #[tokio::test]
    async fn injected_pipeline_failure() {
        let store = MemoryStore::new();
        store.fail_pipelines_after(1);

        store.execute_pipeline(&[WriteCommand::set("a", 1)]).await.unwrap();
        let error = store
            .execute_pipeline(&[WriteCommand::set("b", 1)])
            .await
            .unwrap_err();

        assert!(error.is_upstream_unavailable());
        assert_eq!(store.keys(), vec!["a"]);
    }
}
