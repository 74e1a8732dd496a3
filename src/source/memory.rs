//! In-memory analytical source returning preset rows.

use crate::metrics::error::MetricsError;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;

use super::{AnalyticalSource, QueryResult, Row};

#[derive(Debug, Default)]
pub struct MemorySource {
    rows: Vec<Row>,
    fail_at_row: Option<usize>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MemorySource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Yields an error in place of the row at `index` and stops there.
    pub fn failing_at_row(mut self, index: usize) -> Self {
        self.fail_at_row = Some(index);
        self
    }

    /// Every `(project, query)` pair this source was asked to run, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AnalyticalSource for MemorySource {
    async fn run_query(&self, project: &str, query: &str) -> Result<QueryResult, MetricsError> {
        self.calls
            .lock()
            .push((project.to_owned(), query.to_owned()));

        let mut items: Vec<Result<Row, MetricsError>> =
            self.rows.iter().cloned().map(Ok).collect();
        if let Some(index) = self.fail_at_row {
            items.truncate(index);
            items.push(Err(MetricsError::Source(format!(
                "stream interrupted at row {index}"
            ))));
        }

        Ok(QueryResult {
            total_rows: self.rows.len() as u64,
            rows: futures::stream::iter(items).boxed(),
        })
    }
}
