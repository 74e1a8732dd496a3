use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[cfg(feature = "cache-redis")]
    #[error("redis error")]
    Redis(#[from] redis::RedisError),
    #[error("cache store error: {0}")]
    Store(String),
    #[error("request error")]
    Request(#[from] reqwest::Error),
    #[error("serde_json error")]
    SerdeJson(#[from] serde_json::Error),
    #[error("parse int error")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("malformed article key: {0}")]
    MalformedKey(String),
    #[error("missing column: {0}")]
    MissingColumn(String),
    #[error("column {column} is not of type {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },
    #[error("negative count in column {0}")]
    NegativeCount(String),
    #[error("article id is not an integer: {0}")]
    InvalidArticleId(String),
    #[error("query job error: {0}")]
    QueryJob(String),
    #[error("analytical source error: {0}")]
    Source(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MetricsError {
    /// Returns true for failures of the cache store or the analytical source
    /// themselves, as opposed to bad data found in them.
    ///
    /// The routing layer maps these to a generic "upstream unavailable" response.
    pub fn is_upstream_unavailable(&self) -> bool {
        match self {
            #[cfg(feature = "cache-redis")]
            MetricsError::Redis(_) => true,
            MetricsError::Store(_)
            | MetricsError::Request(_)
            | MetricsError::QueryJob(_)
            | MetricsError::Source(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_upstream_unavailable() {
        assert!(MetricsError::Store("connection refused".to_owned()).is_upstream_unavailable());
        assert!(MetricsError::Source("timeout".to_owned()).is_upstream_unavailable());
    }

    #[test]
    fn data_errors_are_not_upstream_unavailable() {
        assert!(!MetricsError::MalformedKey("article:x".to_owned()).is_upstream_unavailable());
        assert!(!MetricsError::MissingColumn("article_id".to_owned()).is_upstream_unavailable());
    }
}
