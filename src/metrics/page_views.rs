//! Article page views and downloads: totals and per-period series.

use std::sync::Arc;

use super::batch::{RefreshStats, DEFAULT_BATCH_SIZE};
use super::error::MetricsError;
use super::keys::{metric_by_period_key, metric_total_key};
use super::model::{PeriodEntry, TimePeriodResponse};
use super::pagination::paginate;
use super::query_text::{
    get_query_with_replaced_number_of_days, get_query_with_replaced_number_of_months,
    PAGE_VIEWS_AND_DOWNLOADS_DAILY_QUERY, PAGE_VIEWS_AND_DOWNLOADS_MONTHLY_QUERY,
    PAGE_VIEW_AND_DOWNLOAD_TOTALS_QUERY,
};
use super::refresh::{refresh_from_query, RefreshContext};
use crate::common::{Granularity, MetricName};
use crate::source::AnalyticalSource;
use crate::store::{parse_count, CacheStore, WriteCommand};

/// Query texts used by the refresh operations.
#[derive(Debug, Clone)]
pub struct PageViewsAndDownloadsQueries {
    pub totals: String,
    /// Must contain `{number_of_days}`.
    pub daily: String,
    /// Must contain `{number_of_months}`.
    pub monthly: String,
}

impl Default for PageViewsAndDownloadsQueries {
    fn default() -> Self {
        Self {
            totals: PAGE_VIEW_AND_DOWNLOAD_TOTALS_QUERY.to_owned(),
            daily: PAGE_VIEWS_AND_DOWNLOADS_DAILY_QUERY.to_owned(),
            monthly: PAGE_VIEWS_AND_DOWNLOADS_MONTHLY_QUERY.to_owned(),
        }
    }
}

pub struct PageViewsAndDownloadsProvider {
    store: Arc<dyn CacheStore>,
    source: Arc<dyn AnalyticalSource>,
    gcp_project_name: String,
    batch_size: usize,
    queries: PageViewsAndDownloadsQueries,
}

impl PageViewsAndDownloadsProvider {
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
            queries: PageViewsAndDownloadsQueries::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_queries(mut self, queries: PageViewsAndDownloadsQueries) -> Self {
        self.queries = queries;
        self
    }

    /// Reads the total counter of `metric_name`, 0 if absent.
    pub async fn get_metric_total_for_article_id(
        &self,
        article_id: &str,
        metric_name: MetricName,
    ) -> Result<u64, MetricsError> {
        log::debug!("{metric_name}: article_id={article_id}");
        let value = self
            .store
            .get(&metric_total_key(article_id, metric_name))
            .await?;
        parse_count(value.as_deref())
    }

    /// Returns one page of the per-period values of a metric, newest first.
    ///
    /// Periods are sorted as strings, descending. This is chronological only
    /// because period strings are zero-padded fixed width (`YYYY-MM-DD` or
    /// `YYYY-MM`).
    ///
    /// `total_value` comes from the total counter, not from the periods, and
    /// the two may differ.
    ///
    /// # Arguments
    ///
    /// * `article_id`: The article to read.
    /// * `metric_name`: Page views or downloads.
    /// * `granularity`: Selects the `by_date` or `by_month` hash.
    /// * `per_page`: Page size, at least 1.
    /// * `page`: Page number starting at 1. A page past the end is empty.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let response = provider
    ///     .get_metric_for_article_id_by_time_period("12345", MetricName::PageViews, Granularity::Day, 20, 1)
    ///     .await?;
    /// ```
    pub async fn get_metric_for_article_id_by_time_period(
        &self,
        article_id: &str,
        metric_name: MetricName,
        granularity: Granularity,
        per_page: usize,
        page: usize,
    ) -> Result<TimePeriodResponse, MetricsError> {
        log::info!(
            "metric: article_id={article_id}, metric={metric_name}, by={granularity}, per_page={per_page}, page={page}"
        );
        let by_period = self
            .store
            .hash_get_all(&metric_by_period_key(article_id, metric_name, granularity))
            .await?;

        let mut sorted_by_period: Vec<(String, String)> = by_period.into_iter().collect();
        sorted_by_period.sort_by(|a, b| b.0.cmp(&a.0));

        let periods = paginate(&sorted_by_period, per_page, page)
            .iter()
            .map(|(period, value)| {
                Ok(PeriodEntry {
                    period: period.clone(),
                    value: parse_count(Some(value.as_str()))?,
                })
            })
            .collect::<Result<Vec<_>, MetricsError>>()?;

        let total_value = self
            .get_metric_total_for_article_id(article_id, metric_name)
            .await?;

        Ok(TimePeriodResponse {
            total_periods: sorted_by_period.len(),
            total_value,
            periods,
        })
    }

    pub async fn get_page_views_for_article_id_by_time_period(
        &self,
        article_id: &str,
        granularity: Granularity,
        per_page: usize,
        page: usize,
    ) -> Result<TimePeriodResponse, MetricsError> {
        self.get_metric_for_article_id_by_time_period(
            article_id,
            MetricName::PageViews,
            granularity,
            per_page,
            page,
        )
        .await
    }

    pub async fn get_downloads_for_article_id_by_time_period(
        &self,
        article_id: &str,
        granularity: Granularity,
        per_page: usize,
        page: usize,
    ) -> Result<TimePeriodResponse, MetricsError> {
        self.get_metric_for_article_id_by_time_period(
            article_id,
            MetricName::Downloads,
            granularity,
            per_page,
            page,
        )
        .await
    }

    fn refresh_context(&self) -> RefreshContext<'_> {
        RefreshContext {
            store: self.store.as_ref(),
            source: self.source.as_ref(),
            project: &self.gcp_project_name,
            batch_size: self.batch_size,
        }
    }

    /// Overwrites the page view and download totals of every article returned
    /// by the totals query.
    pub async fn refresh_page_view_and_download_totals(&self) -> Result<RefreshStats, MetricsError> {
        refresh_from_query(
            &self.refresh_context(),
            "page view and download totals",
            &self.queries.totals,
            |row| {
                let article_id = row.get_string("article_id")?;
                Ok(vec![
                    WriteCommand::set(
                        metric_total_key(&article_id, MetricName::PageViews),
                        row.get_count("page_view_count")?,
                    ),
                    WriteCommand::set(
                        metric_total_key(&article_id, MetricName::Downloads),
                        row.get_count("download_count")?,
                    ),
                ])
            },
        )
        .await
    }

    /// Overwrites the daily entries of the last `number_of_days` days.
    pub async fn refresh_page_views_and_downloads_daily(
        &self,
        number_of_days: u32,
    ) -> Result<RefreshStats, MetricsError> {
        let query = get_query_with_replaced_number_of_days(&self.queries.daily, number_of_days);
        refresh_from_query(
            &self.refresh_context(),
            "page views and downloads daily",
            &query,
            |row| {
                let article_id = row.get_string("article_id")?;
                let event_date = row.get_date("event_date")?.format("%Y-%m-%d").to_string();
                Ok(period_commands(
                    &article_id,
                    Granularity::Day,
                    &event_date,
                    row.get_count("page_view_count")?,
                    row.get_count("download_count")?,
                ))
            },
        )
        .await
    }

    /// Overwrites the monthly entries of the last `number_of_months` months.
    pub async fn refresh_page_views_and_downloads_monthly(
        &self,
        number_of_months: u32,
    ) -> Result<RefreshStats, MetricsError> {
        let query =
            get_query_with_replaced_number_of_months(&self.queries.monthly, number_of_months);
        refresh_from_query(
            &self.refresh_context(),
            "page views and downloads monthly",
            &query,
            |row| {
                let article_id = row.get_string("article_id")?;
                let year_month = row.get_string("year_month")?;
                Ok(period_commands(
                    &article_id,
                    Granularity::Month,
                    &year_month,
                    row.get_count("page_view_count")?,
                    row.get_count("download_count")?,
                ))
            },
        )
        .await
    }
}

fn period_commands(
    article_id: &str,
    granularity: Granularity,
    period: &str,
    page_view_count: u64,
    download_count: u64,
) -> Vec<WriteCommand> {
    vec![
        WriteCommand::hash_set(
            metric_by_period_key(article_id, MetricName::PageViews, granularity),
            period,
            page_view_count,
        ),
        WriteCommand::hash_set(
            metric_by_period_key(article_id, MetricName::Downloads, granularity),
            period,
            download_count,
        ),
    ]
}
