use serde::{Deserialize, Serialize};
use std::fmt;

/// Article level metric that has both a total counter and per-period hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    PageViews,
    Downloads,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::PageViews => "page_views",
            MetricName::Downloads => "downloads",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time bucketing of a period metric.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Day,
    Month,
}

impl Granularity {
    /// Suffix of the hash key holding the periods for this granularity.
    pub fn key_suffix(&self) -> &'static str {
        match self {
            Granularity::Day => "by_date",
            Granularity::Month => "by_month",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Day => f.write_str("day"),
            Granularity::Month => f.write_str("month"),
        }
    }
}

/// Kinds of non-article content that page views are tracked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    BlogArticle,
    LabsPost,
    Collection,
    Digest,
    Event,
    Interview,
    PressPackage,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::BlogArticle => "blog-article",
            ContentType::LabsPost => "labs-post",
            ContentType::Collection => "collection",
            ContentType::Digest => "digest",
            ContentType::Event => "event",
            ContentType::Interview => "interview",
            ContentType::PressPackage => "press-package",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
