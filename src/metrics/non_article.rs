//! Page views of non-article content (blog articles, collections, ...).
//!
//! Only a total counter is kept per content item; there is no per-period data.

use std::sync::Arc;

use super::batch::{RefreshStats, DEFAULT_BATCH_SIZE};
use super::error::MetricsError;
use super::keys::non_article_page_views_key;
use super::model::TimePeriodResponse;
use super::query_text::NON_ARTICLE_PAGE_VIEW_TOTALS_QUERY;
use super::refresh::{refresh_from_query, RefreshContext};
use crate::common::{ContentType, Granularity};
use crate::source::AnalyticalSource;
use crate::store::{parse_count, CacheStore, WriteCommand};

pub struct NonArticlePageViewsProvider {
    store: Arc<dyn CacheStore>,
    source: Arc<dyn AnalyticalSource>,
    gcp_project_name: String,
    batch_size: usize,
    totals_query: String,
}

impl NonArticlePageViewsProvider {
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
            totals_query: NON_ARTICLE_PAGE_VIEW_TOTALS_QUERY.to_owned(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_totals_query(mut self, query: &str) -> Self {
        self.totals_query = query.to_owned();
        self
    }

    /// Returns the page view total of a content item in the time period shape.
    ///
    /// `granularity` is accepted for symmetry with articles but does not change
    /// the result: `total_periods` is always 0 and `periods` always empty.
    pub async fn get_page_views_by_content_type(
        &self,
        content_type: ContentType,
        content_id: &str,
        granularity: Granularity,
    ) -> Result<TimePeriodResponse, MetricsError> {
        log::info!("page-views: content_type={content_type}, content_id={content_id}, by={granularity}");
        let value = self
            .store
            .get(&non_article_page_views_key(content_type, content_id))
            .await?;

        Ok(TimePeriodResponse {
            total_periods: 0,
            total_value: parse_count(value.as_deref())?,
            periods: Vec::new(),
        })
    }

    pub async fn refresh_non_article_page_view_totals(&self) -> Result<RefreshStats, MetricsError> {
        let context = RefreshContext {
            store: self.store.as_ref(),
            source: self.source.as_ref(),
            project: &self.gcp_project_name,
            batch_size: self.batch_size,
        };
        refresh_from_query(
            &context,
            "non-article page view totals",
            &self.totals_query,
            |row| {
                let content_type = row.get_string("content_type")?;
                let content_id = row.get_string("content_id")?;
                Ok(vec![WriteCommand::set(
                    non_article_page_views_key(&content_type, &content_id),
                    row.get_count("page_view_count")?,
                )])
            },
        )
        .await
    }
}
