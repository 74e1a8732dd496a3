//! Key naming convention for everything this crate keeps in the cache store.
//!
//! ```text
//! article:{id}:{metric}                          integer total
//! article:{id}:{metric}:by_date                  hash, YYYY-MM-DD -> count
//! article:{id}:{metric}:by_month                 hash, YYYY-MM -> count
//! article:{id}:crossref_citations                hash, version ("" if none) -> count
//! non-article:{content_type}:{content_id}:page_views   integer total
//! ```
//!
//! The keys are the only index. Articles are enumerated by scanning for the
//! page views total key.

use std::fmt;

use regex::Regex;

use super::error::MetricsError;
use crate::common::{Granularity, MetricName};

/// Scan pattern matching the page views total of every article.
pub const ARTICLE_PAGE_VIEWS_PATTERN: &str = "article:*:page_views";

lazy_static::lazy_static! {
    static ref ARTICLE_PAGE_VIEWS_REGEX: Regex =
        Regex::new("^article:([^:]+):page_views$").expect("ARTICLE_PAGE_VIEWS_REGEX failed to compile");
}

pub fn metric_total_key(article_id: &str, metric_name: MetricName) -> String {
    format!("article:{article_id}:{metric_name}")
}

pub fn metric_by_period_key(
    article_id: &str,
    metric_name: MetricName,
    granularity: Granularity,
) -> String {
    format!(
        "article:{article_id}:{metric_name}:{}",
        granularity.key_suffix()
    )
}

pub fn crossref_citations_key(article_id: &str) -> String {
    format!("article:{article_id}:crossref_citations")
}

/// `content_type` is a [`crate::common::ContentType`] when reading, and the raw string from
/// the query when refreshing.
pub fn non_article_page_views_key(content_type: impl fmt::Display, content_id: &str) -> String {
    format!("non-article:{content_type}:{content_id}:page_views")
}

/// Extracts the article id from a key matched by [`ARTICLE_PAGE_VIEWS_PATTERN`].
///
/// A key that does not follow the convention was written by something else,
/// so it is reported rather than skipped.
pub fn article_id_from_page_views_key(key: &str) -> Result<&str, MetricsError> {
    ARTICLE_PAGE_VIEWS_REGEX
        .captures(key)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str())
        .ok_or_else(|| MetricsError::MalformedKey(key.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ContentType;

    #[test]
    fn builds_article_keys() {
        assert_eq!(
            metric_total_key("12345", MetricName::Downloads),
            "article:12345:downloads"
        );
        assert_eq!(
            metric_by_period_key("12345", MetricName::PageViews, Granularity::Day),
            "article:12345:page_views:by_date"
        );
        assert_eq!(
            metric_by_period_key("12345", MetricName::Downloads, Granularity::Month),
            "article:12345:downloads:by_month"
        );
        assert_eq!(
            crossref_citations_key("12345"),
            "article:12345:crossref_citations"
        );
    }

    #[test]
    fn builds_non_article_key() {
        assert_eq!(
            non_article_page_views_key(ContentType::BlogArticle, "abc"),
            "non-article:blog-article:abc:page_views"
        );
    }

    #[test]
    fn extracts_article_id() {
        assert_eq!(
            article_id_from_page_views_key("article:10001:page_views").unwrap(),
            "10001"
        );
    }

    #[test]
    fn rejects_keys_outside_the_convention() {
        for key in [
            "article::page_views",
            "article:1:2:page_views",
            "article:1:page_views:by_date",
            "blog:1:page_views",
        ] {
            match article_id_from_page_views_key(key) {
                Err(MetricsError::MalformedKey(k)) => assert_eq!(k, key),
                other => panic!("Expected MalformedKey for {key}, got {other:?}"),
            }
        }
    }
}
