//! Article metrics served from the cache store and refreshed from BigQuery.
//!
//! Query operations only read the store and never fail on missing data: an
//! absent counter is 0 and an absent series is empty. Refresh operations
//! stream query results into the store through batched pipelines; every write
//! overwrites, so a failed refresh can simply be run again.

use std::sync::Arc;

pub mod batch;
pub mod citations;
pub mod enumeration;
pub mod error;
pub mod keys;
pub mod model;
pub mod non_article;
pub mod page_views;
pub mod pagination;
pub mod query_text;
pub mod refresh;
pub mod summary;

use crate::config::Config;
use crate::source::AnalyticalSource;
use crate::store::CacheStore;
use citations::{default_citations_providers, CitationsProvider, CrossrefCitationsProvider};
use enumeration::ArticleEnumeration;
use non_article::NonArticlePageViewsProvider;
use page_views::PageViewsAndDownloadsProvider;
use summary::MetricSummaryProvider;

/// Every provider, built once over a shared store and source.
///
/// This is what a routing layer or a refresh job holds on to.
pub struct MetricsProviders {
    pub page_views_and_downloads: Arc<PageViewsAndDownloadsProvider>,
    pub non_article_page_views: Arc<NonArticlePageViewsProvider>,
    pub crossref_citations: Arc<CrossrefCitationsProvider>,
    pub citations_providers: Vec<Arc<dyn CitationsProvider>>,
    pub article_enumeration: Arc<ArticleEnumeration>,
    pub metric_summary: Arc<MetricSummaryProvider>,
}

impl MetricsProviders {
    pub fn new(
        store: Arc<dyn CacheStore>,
        source: Arc<dyn AnalyticalSource>,
        config: &Config,
    ) -> Self {
        let project = config.gcp_project_name.as_str();
        let batch_size = config.refresh.batch_size;

        let page_views_and_downloads = Arc::new(
            PageViewsAndDownloadsProvider::new(store.clone(), source.clone(), project)
                .with_batch_size(batch_size),
        );
        let non_article_page_views = Arc::new(
            NonArticlePageViewsProvider::new(store.clone(), source.clone(), project)
                .with_batch_size(batch_size),
        );
        let crossref_citations = Arc::new(
            CrossrefCitationsProvider::new(store.clone(), source, project)
                .with_batch_size(batch_size),
        );
        let article_enumeration = Arc::new(ArticleEnumeration::new(store));
        let metric_summary = Arc::new(MetricSummaryProvider::new(
            page_views_and_downloads.clone(),
            crossref_citations.clone(),
            article_enumeration.clone(),
        ));

        Self {
            citations_providers: default_citations_providers(crossref_citations.clone()),
            page_views_and_downloads,
            non_article_page_views,
            crossref_citations,
            article_enumeration,
            metric_summary,
        }
    }
}
