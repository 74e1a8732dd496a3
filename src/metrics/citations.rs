//! Citation counts per citation service.
//!
//! Each service is a [`CitationsProvider`]. Only Crossref has data; the other
//! services are placeholders that always report zero citations.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use super::batch::{RefreshStats, DEFAULT_BATCH_SIZE};
use super::error::MetricsError;
use super::keys::crossref_citations_key;
use super::model::CitationsSourceMetric;
use super::query_text::CROSSREF_CITATIONS_QUERY;
use super::refresh::{refresh_from_query, RefreshContext};
use crate::source::AnalyticalSource;
use crate::store::{parse_count, CacheStore, WriteCommand};

pub const CROSSREF_SERVICE_NAME: &str = "Crossref";
pub const PUBMED_CENTRAL_SERVICE_NAME: &str = "PubMed Central";
pub const SCOPUS_SERVICE_NAME: &str = "Scopus";

/// Canonical DOI URI of an article, or of one of its versions.
pub fn article_uri(article_id: &str, version: Option<u32>) -> String {
    match version {
        Some(version) => format!("https://doi.org/10.7554/eLife.{article_id}.{version}"),
        None => format!("https://doi.org/10.7554/eLife.{article_id}"),
    }
}

/// A source of citation counts.
#[async_trait]
pub trait CitationsProvider: Send + Sync {
    /// Service name reported in every record.
    fn name(&self) -> &str;

    /// Citations of one version of an article. Absent data is 0.
    async fn get_citations_source_metric_for_article_id_and_version(
        &self,
        article_id: &str,
        version: u32,
    ) -> Result<CitationsSourceMetric, MetricsError>;

    /// Citations of all versions of an article combined. Absent data is 0.
    async fn get_combined_citations_source_metric_for_article_id(
        &self,
        article_id: &str,
    ) -> Result<CitationsSourceMetric, MetricsError>;

    /// Reloads the provider's data from the analytical source.
    async fn refresh_data(&self) -> Result<RefreshStats, MetricsError>;
}

/// Crossref citations kept in one hash per article, keyed by version number.
///
/// Citations without a version are stored under the empty field.
pub struct CrossrefCitationsProvider {
    store: Arc<dyn CacheStore>,
    source: Arc<dyn AnalyticalSource>,
    gcp_project_name: String,
    batch_size: usize,
    query: String,
}

impl CrossrefCitationsProvider {
    pub fn new(
        store: Arc<dyn CacheStore>,
        source: Arc<dyn AnalyticalSource>,
        gcp_project_name: &str,
    ) -> Self {
        Self {
            store,
            source,
            gcp_project_name: gcp_project_name.to_owned(),
            batch_size: DEFAULT_BATCH_SIZE,
            query: CROSSREF_CITATIONS_QUERY.to_owned(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.to_owned();
        self
    }
}

#[async_trait]
impl CitationsProvider for CrossrefCitationsProvider {
    fn name(&self) -> &str {
        CROSSREF_SERVICE_NAME
    }

    async fn get_citations_source_metric_for_article_id_and_version(
        &self,
        article_id: &str,
        version: u32,
    ) -> Result<CitationsSourceMetric, MetricsError> {
        let value = self
            .store
            .hash_get(&crossref_citations_key(article_id), &version.to_string())
            .await?;
        let citations = parse_count(value.as_deref())?;
        log::debug!("Citations for article_id={article_id}, version_number={version}: {citations}");

        Ok(CitationsSourceMetric {
            service: self.name().to_owned(),
            uri: article_uri(article_id, Some(version)),
            citations,
        })
    }

    async fn get_combined_citations_source_metric_for_article_id(
        &self,
        article_id: &str,
    ) -> Result<CitationsSourceMetric, MetricsError> {
        let by_version = self
            .store
            .hash_get_all(&crossref_citations_key(article_id))
            .await?;
        let mut citations = 0;
        for value in by_version.values() {
            citations += parse_count(Some(value.as_str()))?;
        }
        log::debug!("Combined citations for article_id={article_id}: {citations}");

        Ok(CitationsSourceMetric {
            service: self.name().to_owned(),
            uri: article_uri(article_id, None),
            citations,
        })
    }

    async fn refresh_data(&self) -> Result<RefreshStats, MetricsError> {
        let context = RefreshContext {
            store: self.store.as_ref(),
            source: self.source.as_ref(),
            project: &self.gcp_project_name,
            batch_size: self.batch_size,
        };
        refresh_from_query(&context, "crossref citations", &self.query, |row| {
            let article_id = row.get_string("article_id")?;
            let version = row.get_optional_string("version_number")?.unwrap_or_default();
            Ok(vec![WriteCommand::hash_set(
                crossref_citations_key(&article_id),
                version,
                row.get_count("citation_count")?,
            )])
        })
        .await
    }
}

/// A service without data: always zero citations and an empty URI.
#[derive(Debug, Clone)]
pub struct DummyCitationsProvider {
    name: String,
}

impl DummyCitationsProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }

    fn metric(&self) -> CitationsSourceMetric {
        CitationsSourceMetric {
            service: self.name.clone(),
            uri: String::new(),
            citations: 0,
        }
    }
}

#[async_trait]
impl CitationsProvider for DummyCitationsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_citations_source_metric_for_article_id_and_version(
        &self,
        _article_id: &str,
        _version: u32,
    ) -> Result<CitationsSourceMetric, MetricsError> {
        Ok(self.metric())
    }

    async fn get_combined_citations_source_metric_for_article_id(
        &self,
        _article_id: &str,
    ) -> Result<CitationsSourceMetric, MetricsError> {
        Ok(self.metric())
    }

    async fn refresh_data(&self) -> Result<RefreshStats, MetricsError> {
        log::debug!("Nothing to refresh for {}", self.name);
        Ok(RefreshStats::default())
    }
}

/// Crossref followed by the placeholder services, in response order.
pub fn default_citations_providers(
    crossref: Arc<CrossrefCitationsProvider>,
) -> Vec<Arc<dyn CitationsProvider>> {
    let crossref: Arc<dyn CitationsProvider> = crossref;
    vec![
        crossref,
        Arc::new(DummyCitationsProvider::new(PUBMED_CENTRAL_SERVICE_NAME)),
        Arc::new(DummyCitationsProvider::new(SCOPUS_SERVICE_NAME)),
    ]
}

/// Combined citations from every provider, one record each in provider order.
pub async fn get_citations_for_article_id(
    providers: &[Arc<dyn CitationsProvider>],
    article_id: &str,
) -> Result<Vec<CitationsSourceMetric>, MetricsError> {
    log::info!("citations: article_id={article_id}");
    try_join_all(
        providers
            .iter()
            .map(|provider| provider.get_combined_citations_source_metric_for_article_id(article_id)),
    )
    .await
}

/// Citations of one version from every provider, one record each in provider order.
pub async fn get_citations_for_article_id_and_version(
    providers: &[Arc<dyn CitationsProvider>],
    article_id: &str,
    version: u32,
) -> Result<Vec<CitationsSourceMetric>, MetricsError> {
    log::info!("citations: article_id={article_id}, version={version}");
    try_join_all(providers.iter().map(|provider| {
        provider.get_citations_source_metric_for_article_id_and_version(article_id, version)
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, Row};
    use crate::store::MemoryStore;

    fn crossref(store: Arc<MemoryStore>, rows: Vec<Row>) -> CrossrefCitationsProvider {
        CrossrefCitationsProvider::new(store, Arc::new(MemorySource::new(rows)), "project")
    }

    async fn store_with_citations() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (version, count) in [("1", 12), ("2", 8), ("", 43), ("3", 3)] {
            store
                .hash_set("article:12345:crossref_citations", version, count)
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn citations_for_version() {
        let provider = crossref(store_with_citations().await, Vec::new());

        let metric = provider
            .get_citations_source_metric_for_article_id_and_version("12345", 2)
            .await
            .unwrap();

        assert_eq!(
            metric,
            CitationsSourceMetric {
                service: "Crossref".to_owned(),
                uri: "https://doi.org/10.7554/eLife.12345.2".to_owned(),
                citations: 8,
            }
        );
    }

    #[tokio::test]
    async fn absent_version_is_zero_with_versioned_uri() {
        let provider = crossref(store_with_citations().await, Vec::new());

        let metric = provider
            .get_citations_source_metric_for_article_id_and_version("12345", 9)
            .await
            .unwrap();

        assert_eq!(metric.citations, 0);
        assert_eq!(metric.uri, "https://doi.org/10.7554/eLife.12345.9");
    }

    #[tokio::test]
    async fn absent_article_is_zero() {
        let provider = crossref(Arc::new(MemoryStore::new()), Vec::new());

        let by_version = provider
            .get_citations_source_metric_for_article_id_and_version("99999", 1)
            .await
            .unwrap();
        let combined = provider
            .get_combined_citations_source_metric_for_article_id("99999")
            .await
            .unwrap();

        assert_eq!(by_version.citations, 0);
        assert_eq!(combined.citations, 0);
    }

    #[tokio::test]
    async fn combined_sums_every_version() {
        let provider = crossref(store_with_citations().await, Vec::new());

        let metric = provider
            .get_combined_citations_source_metric_for_article_id("12345")
            .await
            .unwrap();

        assert_eq!(metric.citations, 66);
        assert_eq!(metric.uri, "https://doi.org/10.7554/eLife.12345");
    }

    #[tokio::test]
    async fn refresh_uses_empty_field_without_version() {
        let store = Arc::new(MemoryStore::new());
        let rows = vec![
            Row::new()
                .with("article_id", "12345")
                .with("version_number", "1")
                .with("citation_count", 12_i64),
            Row::new()
                .with("article_id", "12345")
                .with("version_number", None::<String>)
                .with("citation_count", 43_i64),
        ];
        let provider = crossref(store.clone(), rows);

        let stats = provider.refresh_data().await.unwrap();

        assert_eq!(stats.rows, 2);
        assert_eq!(
            store.snapshot(),
            vec![
                ("article:12345:crossref_citations#".to_owned(), "43".to_owned()),
                ("article:12345:crossref_citations#1".to_owned(), "12".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn dummy_provider_reports_zero() {
        let provider = DummyCitationsProvider::new("Scopus");

        let metric = provider
            .get_combined_citations_source_metric_for_article_id("12345")
            .await
            .unwrap();

        assert_eq!(
            metric,
            CitationsSourceMetric {
                service: "Scopus".to_owned(),
                uri: String::new(),
                citations: 0,
            }
        );
        assert_eq!(provider.refresh_data().await.unwrap(), RefreshStats::default());
    }

    #[tokio::test]
    async fn fan_out_keeps_provider_order() {
        let store = store_with_citations().await;
        let providers = default_citations_providers(Arc::new(crossref(store, Vec::new())));

        let metrics = get_citations_for_article_id_and_version(&providers, "12345", 1)
            .await
            .unwrap();

        let services: Vec<&str> = metrics.iter().map(|m| m.service.as_str()).collect();
        assert_eq!(services, vec!["Crossref", "PubMed Central", "Scopus"]);
        assert_eq!(metrics[0].citations, 12);
        assert_eq!(metrics[1].citations, 0);

        let combined = get_citations_for_article_id(&providers, "12345").await.unwrap();
        assert_eq!(combined[0].citations, 66);
    }
}
