//! Named refresh jobs, for a scheduler or a command line to trigger.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::config::RefreshConfig;
use crate::metrics::batch::RefreshStats;
use crate::metrics::MetricsProviders;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshJob {
    PageViewAndDownloadTotals,
    PageViewsAndDownloadsDaily { number_of_days: u32 },
    PageViewsAndDownloadsMonthly { number_of_months: u32 },
    /// Every citations provider, in turn.
    Citations,
    NonArticlePageViewTotals,
}

impl RefreshJob {
    /// Parses a kebab-case job name, taking the trailing windows from `config`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let job = RefreshJob::from_name("page-views-and-downloads-daily", &config.refresh)?;
    /// ```
    pub fn from_name(name: &str, config: &RefreshConfig) -> Result<Self> {
        let job = match name {
            "page-view-and-download-totals" => RefreshJob::PageViewAndDownloadTotals,
            "page-views-and-downloads-daily" => RefreshJob::PageViewsAndDownloadsDaily {
                number_of_days: config.number_of_days,
            },
            "page-views-and-downloads-monthly" => RefreshJob::PageViewsAndDownloadsMonthly {
                number_of_months: config.number_of_months,
            },
            "citations" => RefreshJob::Citations,
            "non-article-page-view-totals" => RefreshJob::NonArticlePageViewTotals,
            _ => bail!("unknown refresh job: {name}"),
        };
        Ok(job)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RefreshJob::PageViewAndDownloadTotals => "page-view-and-download-totals",
            RefreshJob::PageViewsAndDownloadsDaily { .. } => "page-views-and-downloads-daily",
            RefreshJob::PageViewsAndDownloadsMonthly { .. } => "page-views-and-downloads-monthly",
            RefreshJob::Citations => "citations",
            RefreshJob::NonArticlePageViewTotals => "non-article-page-view-totals",
        }
    }
}

impl fmt::Display for RefreshJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses with the default trailing windows.
impl FromStr for RefreshJob {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> Result<Self> {
        RefreshJob::from_name(name, &RefreshConfig::default())
    }
}

/// Runs one refresh job to completion.
///
/// Errors are not retried here. Every refresh only overwrites, so the job can
/// be started again after a failure.
pub async fn run_refresh_job(providers: &MetricsProviders, job: RefreshJob) -> Result<RefreshStats> {
    log::info!("Starting refresh job {job}");
    let stats = match job {
        RefreshJob::PageViewAndDownloadTotals => {
            providers
                .page_views_and_downloads
                .refresh_page_view_and_download_totals()
                .await
        }
        RefreshJob::PageViewsAndDownloadsDaily { number_of_days } => {
            providers
                .page_views_and_downloads
                .refresh_page_views_and_downloads_daily(number_of_days)
                .await
        }
        RefreshJob::PageViewsAndDownloadsMonthly { number_of_months } => {
            providers
                .page_views_and_downloads
                .refresh_page_views_and_downloads_monthly(number_of_months)
                .await
        }
        RefreshJob::Citations => {
            let mut total = RefreshStats::default();
            for provider in &providers.citations_providers {
                let stats = provider
                    .refresh_data()
                    .await
                    .with_context(|| format!("refreshing {} citations", provider.name()))?;
                total.rows += stats.rows;
                total.batches += stats.batches;
            }
            Ok(total)
        }
        RefreshJob::NonArticlePageViewTotals => {
            providers
                .non_article_page_views
                .refresh_non_article_page_view_totals()
                .await
        }
    }
    .with_context(|| format!("refresh job {job} failed"))?;

    log::info!(
        "Refresh job {job} completed: {} rows in {} batches",
        stats.rows,
        stats.batches
    );
    Ok(stats)
}
