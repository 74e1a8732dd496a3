//! The refresh loop shared by every metric family.

use futures::TryStreamExt;

use super::batch::{BatchWriter, RefreshStats};
use crate::metrics::error::MetricsError;
use crate::source::{AnalyticalSource, Row};
use crate::store::{CacheStore, WriteCommand};

/// Where a refresh reads from and writes to.
pub struct RefreshContext<'a> {
    pub store: &'a dyn CacheStore,
    pub source: &'a dyn AnalyticalSource,
    pub project: &'a str,
    pub batch_size: usize,
}

/// Runs `query` and writes the commands produced for each row in batches.
///
/// The first error, from the source, from `row_to_commands` or from the store,
/// aborts the refresh. Batches flushed before it stay written; since every
/// command overwrites, running the refresh again converges.
///
/// # Arguments
///
/// * `context`: Store, source, project and batch size to use.
/// * `desc`: Short label used in progress messages.
/// * `query`: Final query text, placeholders already replaced.
/// * `row_to_commands`: Maps one row to its writes.
///
/// # Returns
///
/// The number of rows written and pipelines executed.
pub async fn refresh_from_query<F>(
    context: &RefreshContext<'_>,
    desc: &str,
    query: &str,
    mut row_to_commands: F,
) -> Result<RefreshStats, MetricsError>
where
    F: FnMut(&Row) -> Result<Vec<WriteCommand>, MetricsError>,
{
    log::info!("Refreshing {desc} data from BigQuery...");
    let mut result = context.source.run_query(context.project, query).await?;
    let total_rows = result.total_rows;
    log::info!("Total rows from BigQuery: {total_rows}");

    let mut writer = BatchWriter::new(context.store, context.batch_size);
    while let Some(row) = result.rows.try_next().await? {
        let commands = row_to_commands(&row)?;
        if writer.push_row(commands).await? {
            log::info!("{desc}: {}/{total_rows} rows", writer.stats().rows);
        }
    }

    let stats = writer.finish().await?;
    log::info!("{desc}: {}/{total_rows} rows", stats.rows);
    log::info!("Done: Refreshing {desc} data from BigQuery");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::store::MemoryStore;

    fn rows(n: i64) -> Vec<Row> {
        (0..n)
            .map(|i| {
                Row::new()
                    .with("article_id", format!("{}", 10000 + i))
                    .with("page_view_count", i * 10)
            })
            .collect()
    }

    fn to_commands(row: &Row) -> Result<Vec<WriteCommand>, MetricsError> {
        Ok(vec![WriteCommand::set(
            format!("article:{}:page_views", row.get_string("article_id")?),
            row.get_count("page_view_count")?,
        )])
    }

    #[tokio::test]
    async fn writes_every_row_once_in_batches() {
        let store = MemoryStore::new();
        let source = MemorySource::new(rows(5));
        let context = RefreshContext {
            store: &store,
            source: &source,
            project: "project",
            batch_size: 2,
        };

        let stats = refresh_from_query(&context, "test", "SELECT 1", to_commands)
            .await
            .unwrap();

        assert_eq!(stats, RefreshStats { rows: 5, batches: 3 });
        assert_eq!(store.pipeline_executions(), 3);
        assert_eq!(store.keys().len(), 5);
        assert_eq!(
            source.calls(),
            vec![("project".to_owned(), "SELECT 1".to_owned())]
        );
    }

    #[tokio::test]
    async fn running_twice_gives_the_same_state() {
        let store = MemoryStore::new();
        let source = MemorySource::new(rows(7));
        let context = RefreshContext {
            store: &store,
            source: &source,
            project: "project",
            batch_size: 3,
        };

        refresh_from_query(&context, "test", "q", to_commands).await.unwrap();
        let first = store.snapshot();
        refresh_from_query(&context, "test", "q", to_commands).await.unwrap();

        assert_eq!(store.snapshot(), first);
    }

    #[tokio::test]
    async fn source_failure_keeps_flushed_batches() {
        let store = MemoryStore::new();
        let source = MemorySource::new(rows(5)).failing_at_row(3);
        let context = RefreshContext {
            store: &store,
            source: &source,
            project: "project",
            batch_size: 2,
        };

        let result = refresh_from_query(&context, "test", "q", to_commands).await;

        match result {
            Err(MetricsError::Source(_)) => (),
            other => panic!("Expected Source error, got {other:?}"),
        }
        // Row 2 was buffered but never flushed.
        assert_eq!(store.keys(), vec!["article:10000:page_views", "article:10001:page_views"]);
    }

    #[tokio::test]
    async fn rerun_after_store_failure_converges() {
        let expected = {
            let store = MemoryStore::new();
            let source = MemorySource::new(rows(5));
            let context = RefreshContext {
                store: &store,
                source: &source,
                project: "project",
                batch_size: 2,
            };
            refresh_from_query(&context, "test", "q", to_commands).await.unwrap();
            store.snapshot()
        };

        let store = MemoryStore::new();
        let source = MemorySource::new(rows(5));
        let context = RefreshContext {
            store: &store,
            source: &source,
            project: "project",
            batch_size: 2,
        };
        store.fail_pipelines_after(1);
        let error = refresh_from_query(&context, "test", "q", to_commands)
            .await
            .unwrap_err();
        assert!(error.is_upstream_unavailable());
        assert_eq!(store.keys().len(), 2);

        store.fail_pipelines_after(usize::MAX);
        refresh_from_query(&context, "test", "q", to_commands).await.unwrap();

        assert_eq!(store.snapshot(), expected);
    }

    #[tokio::test]
    async fn bad_row_aborts() {
        let store = MemoryStore::new();
        let source = MemorySource::new(vec![Row::new().with("article_id", "1")]);
        let context = RefreshContext {
            store: &store,
            source: &source,
            project: "project",
            batch_size: 2,
        };

        match refresh_from_query(&context, "test", "q", to_commands).await {
            Err(MetricsError::MissingColumn(column)) => assert_eq!(column, "page_view_count"),
            other => panic!("Expected MissingColumn error, got {other:?}"),
        }
        assert!(store.keys().is_empty());
    }
}
