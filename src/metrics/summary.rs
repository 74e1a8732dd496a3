//! Per-article metric summaries.

use std::sync::Arc;

use super::citations::{CitationsProvider, CrossrefCitationsProvider};
use super::enumeration::ArticleEnumeration;
use super::error::MetricsError;
use super::model::{MetricSummaryItem, MetricSummaryResponse};
use super::page_views::PageViewsAndDownloadsProvider;
use crate::common::MetricName;

pub struct MetricSummaryProvider {
    page_views_and_downloads: Arc<PageViewsAndDownloadsProvider>,
    crossref_citations: Arc<CrossrefCitationsProvider>,
    enumeration: Arc<ArticleEnumeration>,
}

impl MetricSummaryProvider {
    pub fn new(
        page_views_and_downloads: Arc<PageViewsAndDownloadsProvider>,
        crossref_citations: Arc<CrossrefCitationsProvider>,
        enumeration: Arc<ArticleEnumeration>,
    ) -> Self {
        Self {
            page_views_and_downloads,
            crossref_citations,
            enumeration,
        }
    }

    async fn get_summary_item(&self, article_id: &str) -> Result<MetricSummaryItem, MetricsError> {
        let id = article_id
            .parse::<u64>()
            .map_err(|_| MetricsError::InvalidArticleId(article_id.to_owned()))?;
        let views = self
            .page_views_and_downloads
            .get_metric_total_for_article_id(article_id, MetricName::PageViews)
            .await?;
        let downloads = self
            .page_views_and_downloads
            .get_metric_total_for_article_id(article_id, MetricName::Downloads)
            .await?;
        let crossref = self
            .crossref_citations
            .get_combined_citations_source_metric_for_article_id(article_id)
            .await?
            .citations;

        Ok(MetricSummaryItem {
            id,
            views,
            downloads,
            crossref,
            pubmed: 0,
            scopus: 0,
        })
    }

    /// Summary of a single article: `total` is always 1.
    pub async fn get_summary_for_article_id(
        &self,
        article_id: &str,
    ) -> Result<MetricSummaryResponse, MetricsError> {
        log::info!("summary: article_id={article_id}");
        Ok(MetricSummaryResponse {
            total: 1,
            items: vec![self.get_summary_item(article_id).await?],
        })
    }

    /// Summaries of one page of articles, in enumeration order.
    ///
    /// `total` counts every known article, not just the page.
    pub async fn get_summary_for_all_articles(
        &self,
        per_page: usize,
        page: usize,
    ) -> Result<MetricSummaryResponse, MetricsError> {
        log::info!("summary: per_page={per_page}, page={page}");
        let total = self.enumeration.get_total_article_count().await?;
        let article_ids = self.enumeration.get_article_ids(per_page, page).await?;

        let mut items = Vec::with_capacity(article_ids.len());
        for article_id in &article_ids {
            items.push(self.get_summary_item(article_id).await?);
        }

        Ok(MetricSummaryResponse { total, items })
    }
}
