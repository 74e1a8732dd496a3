//! Listing the articles known to the cache store.
//!
//! There is no index: articles are found by scanning for their page views
//! total key.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::error::MetricsError;
use super::keys::{article_id_from_page_views_key, ARTICLE_PAGE_VIEWS_PATTERN};
use super::pagination::paginate;
use crate::store::CacheStore;

pub struct ArticleEnumeration {
    store: Arc<dyn CacheStore>,
}

impl ArticleEnumeration {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Returns one page of article ids.
    ///
    /// Ids are distinct and sorted as strings, so `"10000"` comes before `"9999"`. A key
    /// matching the scan pattern but not the key convention fails the whole
    /// call with [`MetricsError::MalformedKey`].
    pub async fn get_article_ids(
        &self,
        per_page: usize,
        page: usize,
    ) -> Result<Vec<String>, MetricsError> {
        let keys = self.store.scan_keys(ARTICLE_PAGE_VIEWS_PATTERN).await?;
        let article_ids = keys
            .iter()
            .map(|key| article_id_from_page_views_key(key).map(str::to_owned))
            .collect::<Result<BTreeSet<_>, _>>()?
            .into_iter()
            .collect::<Vec<_>>();
        log::debug!("Found {} article ids", article_ids.len());

        Ok(paginate(&article_ids, per_page, page).to_vec())
    }

    /// Number of articles with a page views total, independent of any page.
    pub async fn get_total_article_count(&self) -> Result<usize, MetricsError> {
        let keys = self.store.scan_keys(ARTICLE_PAGE_VIEWS_PATTERN).await?;
        Ok(keys.iter().collect::<BTreeSet<_>>().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, WriteCommand};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Returns every scanned key twice, like a Redis scan racing a rehash.
    struct RepeatingScanStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl CacheStore for RepeatingScanStore {
        async fn get(&self, key: &str) -> Result<Option<String>, MetricsError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: u64) -> Result<(), MetricsError> {
            self.inner.set(key, value).await
        }

        async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, MetricsError> {
            self.inner.hash_get(key, field).await
        }

        async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, MetricsError> {
            self.inner.hash_get_all(key).await
        }

        async fn hash_set(&self, key: &str, field: &str, value: u64) -> Result<(), MetricsError> {
            self.inner.hash_set(key, field, value).await
        }

        async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, MetricsError> {
            let keys = self.inner.scan_keys(pattern).await?;
            Ok(keys.iter().chain(keys.iter()).cloned().collect())
        }

        async fn execute_pipeline(&self, commands: &[WriteCommand]) -> Result<(), MetricsError> {
            self.inner.execute_pipeline(commands).await
        }
    }

    async fn enumeration_with(article_ids: &[&str]) -> ArticleEnumeration {
        let store = Arc::new(MemoryStore::new());
        for article_id in article_ids {
            store
                .set(&format!("article:{article_id}:page_views"), 1)
                .await
                .unwrap();
            store
                .set(&format!("article:{article_id}:downloads"), 1)
                .await
                .unwrap();
        }
        ArticleEnumeration::new(store)
    }

    #[tokio::test]
    async fn pages_through_sorted_ids() {
        let enumeration = enumeration_with(&["10003", "10001", "10002"]).await;

        assert_eq!(enumeration.get_article_ids(2, 1).await.unwrap(), vec!["10001", "10002"]);
        assert_eq!(enumeration.get_article_ids(2, 2).await.unwrap(), vec!["10003"]);
        assert!(enumeration.get_article_ids(2, 3).await.unwrap().is_empty());
        assert_eq!(enumeration.get_total_article_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn ids_sort_as_strings() {
        let enumeration = enumeration_with(&["9999", "10000"]).await;

        assert_eq!(
            enumeration.get_article_ids(10, 1).await.unwrap(),
            vec!["10000", "9999"]
        );
    }

    #[tokio::test]
    async fn empty_store() {
        let enumeration = enumeration_with(&[]).await;

        assert!(enumeration.get_article_ids(10, 1).await.unwrap().is_empty());
        assert_eq!(enumeration.get_total_article_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn repeated_scan_keys_count_once() {
        let inner = MemoryStore::new();
        for article_id in ["10001", "10002"] {
            inner
                .set(&format!("article:{article_id}:page_views"), 1)
                .await
                .unwrap();
        }
        let enumeration = ArticleEnumeration::new(Arc::new(RepeatingScanStore { inner }));

        assert_eq!(
            enumeration.get_article_ids(10, 1).await.unwrap(),
            vec!["10001", "10002"]
        );
        assert_eq!(enumeration.get_article_ids(1, 2).await.unwrap(), vec!["10002"]);
        assert_eq!(enumeration.get_total_article_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn malformed_key_fails_enumeration() {
        let store = Arc::new(MemoryStore::new());
        store.set("article:1:page_views", 1).await.unwrap();
        store.set("article:2:extra:page_views", 1).await.unwrap();
        let enumeration = ArticleEnumeration::new(store);

        match enumeration.get_article_ids(10, 1).await {
            Err(MetricsError::MalformedKey(key)) => assert_eq!(key, "article:2:extra:page_views"),
            other => panic!("Expected MalformedKey error, got {other:?}"),
        }
    }
}
