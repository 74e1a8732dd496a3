//! Article metrics API core.
//!
//! Page views, downloads and citations of articles are precomputed in BigQuery,
//! copied into Redis by refresh jobs, and read back from Redis when serving
//! requests.
//!
//! ```ignore
//! let config = Config::from_env()?;
//! let store = Arc::new(RedisStore::from_url(&config.redis_url()).await?);
//! let source = Arc::new(BigQuerySource::new(&token, None));
//! let providers = MetricsProviders::new(store, source, &config);
//!
//! let response = providers
//!     .page_views_and_downloads
//!     .get_page_views_for_article_id_by_time_period("12345", Granularity::Day, 20, 1)
//!     .await?;
//! ```

pub mod common;
pub mod config;
pub mod jobs;
pub mod metrics;
pub mod source;
pub mod store;

pub use common::{ContentType, Granularity, MetricName};
pub use config::{Config, RefreshConfig};
pub use jobs::{run_refresh_job, RefreshJob};
pub use metrics::batch::RefreshStats;
pub use metrics::error::MetricsError;
pub use metrics::model::{
    CitationsSourceMetric, MetricSummaryItem, MetricSummaryResponse, PeriodEntry,
    TimePeriodResponse,
};
pub use metrics::MetricsProviders;
pub use source::{AnalyticalSource, BigQuerySource, MemorySource};
pub use store::{CacheStore, MemoryStore};

#[cfg(feature = "cache-redis")]
pub use store::RedisStore;
