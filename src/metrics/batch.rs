//! Batched pipeline writes.
//!
//! Rows are buffered as [`WriteCommand`]s and sent through
//! [`CacheStore::execute_pipeline`] every `batch_size` rows, plus once at the
//! end for the remainder. A batch is only a round trip saving: a flushed batch
//! stays written if a later one fails.

use crate::metrics::error::MetricsError;
use crate::store::{CacheStore, WriteCommand};

/// Default number of rows per pipelined batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Outcome of a refresh.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    /// Rows read from the source and written.
    pub rows: u64,
    /// Pipelines executed.
    pub batches: usize,
}

pub struct BatchWriter<'a> {
    store: &'a dyn CacheStore,
    batch_size: usize,
    pending: Vec<WriteCommand>,
    rows_in_batch: usize,
    stats: RefreshStats,
}

impl<'a> BatchWriter<'a> {
    /// A `batch_size` of 0 is treated as 1.
    pub fn new(store: &'a dyn CacheStore, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            rows_in_batch: 0,
            stats: RefreshStats::default(),
        }
    }

    /// Queues the writes of one row and flushes if the batch is full.
    ///
    /// Returns `true` when this call flushed a batch.
    pub async fn push_row(
        &mut self,
        commands: impl IntoIterator<Item = WriteCommand>,
    ) -> Result<bool, MetricsError> {
        self.pending.extend(commands);
        self.rows_in_batch += 1;
        self.stats.rows += 1;

        if self.rows_in_batch >= self.batch_size {
            self.flush().await?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn stats(&self) -> RefreshStats {
        self.stats
    }

    async fn flush(&mut self) -> Result<(), MetricsError> {
        self.store.execute_pipeline(&self.pending).await?;
        self.pending.clear();
        self.rows_in_batch = 0;
        self.stats.batches += 1;
        Ok(())
    }

    /// Flushes the remaining rows, if any.
    pub async fn finish(mut self) -> Result<RefreshStats, MetricsError> {
        if self.rows_in_batch > 0 {
            self.flush().await?;
        }
        Ok(self.stats)
    }
}
