//! BigQuery source over the BigQuery v2 REST API.
//!
//! The query is started with `jobs.query`. If the job has not finished within
//! the request, `jobs.getQueryResults` is polled until it has. Rows are then
//! paged lazily with `pageToken`: a page is only fetched once the previous one
//! has been consumed.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;

use super::{AnalyticalSource, QueryResult, Row, Value};
use crate::metrics::error::MetricsError;
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Rows requested per page.
const DEFAULT_PAGE_SIZE: u32 = 10_000;

/// Time to wait between two polls of an unfinished job.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    total_rows: Option<String>,
    page_token: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    v: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    message: Option<String>,
}

impl QueryResponse {
    fn check_errors(&self) -> Result<(), MetricsError> {
        match self.errors.first() {
            Some(error) => Err(MetricsError::QueryJob(
                error.message.clone().unwrap_or_default(),
            )),
            None => Ok(()),
        }
    }
}

/// Converts one BigQuery cell into a typed value according to its column type.
fn convert_cell(field: &FieldSchema, cell: &TableCell) -> Result<Value, MetricsError> {
    let raw = match &cell.v {
        None | Some(serde_json::Value::Null) => return Ok(Value::Null),
        Some(serde_json::Value::String(raw)) => raw.as_str(),
        Some(_) => {
            return Err(MetricsError::ColumnType {
                column: field.name.clone(),
                expected: "scalar",
            })
        }
    };

    match field.field_type.as_str() {
        "INTEGER" | "INT64" => Ok(Value::Integer(raw.parse::<i64>()?)),
        "DATE" => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| MetricsError::ColumnType {
                column: field.name.clone(),
                expected: "date",
            }),
        _ => Ok(Value::String(raw.to_owned())),
    }
}

fn convert_rows(schema: &[FieldSchema], rows: Vec<TableRow>) -> Result<Vec<Row>, MetricsError> {
    rows.into_iter()
        .map(|table_row| {
            if table_row.f.len() != schema.len() {
                return Err(MetricsError::QueryJob(format!(
                    "row has {} cells but the schema has {} fields",
                    table_row.f.len(),
                    schema.len()
                )));
            }
            let mut row = Row::new();
            for (field, cell) in schema.iter().zip(table_row.f.iter()) {
                row.insert(&field.name, convert_cell(field, cell)?);
            }
            Ok(row)
        })
        .collect()
}

/// Everything needed to fetch further pages of a finished job.
#[derive(Clone)]
struct PageFetcher {
    client: reqwest::Client,
    access_token: Arc<str>,
    results_url: String,
    location: Option<String>,
    page_size: u32,
    schema: Arc<Vec<FieldSchema>>,
}

impl PageFetcher {
    async fn fetch(&self, page_token: Option<&str>) -> Result<QueryResponse, MetricsError> {
        let mut request = self
            .client
            .get(&self.results_url)
            .bearer_auth(&self.access_token)
            .query(&[("maxResults", self.page_size.to_string())]);
        if let Some(location) = &self.location {
            request = request.query(&[("location", location)]);
        }
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response: QueryResponse = request.send().await?.error_for_status()?.json().await?;
        response.check_errors()?;
        Ok(response)
    }
}

/// Where the row stream stands between pages.
enum PageCursor {
    First(Vec<Row>, Option<String>),
    Next(String),
    Done,
}

impl PageCursor {
    fn after(page_token: Option<String>) -> Self {
        page_token.map_or(PageCursor::Done, PageCursor::Next)
    }
}

async fn next_page(
    fetcher: PageFetcher,
    cursor: PageCursor,
) -> Result<Option<(Vec<Row>, PageCursor)>, MetricsError> {
    match cursor {
        PageCursor::First(rows, page_token) => Ok(Some((rows, PageCursor::after(page_token)))),
        PageCursor::Next(page_token) => {
            log::debug!("Fetching next BigQuery page");
            let page = fetcher.fetch(Some(page_token.as_str())).await?;
            let rows = convert_rows(&fetcher.schema, page.rows)?;
            Ok(Some((rows, PageCursor::after(page.page_token))))
        }
        PageCursor::Done => Ok(None),
    }
}

/// Runs queries through the BigQuery REST API with a bearer access token.
pub struct BigQuerySource {
    client: reqwest::Client,
    access_token: Arc<str>,
    base_url: String,
    page_size: u32,
}

impl BigQuerySource {
    pub fn new(access_token: &str, client: Option<&reqwest::Client>) -> Self {
        let client = match client {
            Some(t) => t.to_owned(),
            None => reqwest::Client::new(),
        };
        Self {
            client,
            access_token: Arc::from(access_token),
            base_url: DEFAULT_BASE_URL.to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Points the source at another endpoint, e.g. a local emulator.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    async fn start_query(&self, project: &str, query: &str) -> Result<QueryResponse, MetricsError> {
        let body = serde_json::json!({
            "query": query,
            "useLegacySql": false,
            "maxResults": self.page_size,
        });

        let response: QueryResponse = self
            .client
            .post(format!("{}/projects/{project}/queries", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.check_errors()?;
        Ok(response)
    }
}

#[async_trait]
impl AnalyticalSource for BigQuerySource {
    async fn run_query(&self, project: &str, query: &str) -> Result<QueryResult, MetricsError> {
        let mut response = self.start_query(project, query).await?;
        let job_reference = response
            .job_reference
            .clone()
            .ok_or_else(|| MetricsError::QueryJob("response without job reference".to_owned()))?;

        let mut fetcher = PageFetcher {
            client: self.client.clone(),
            access_token: self.access_token.clone(),
            results_url: format!(
                "{}/projects/{project}/queries/{}",
                self.base_url, job_reference.job_id
            ),
            location: job_reference.location.clone(),
            page_size: self.page_size,
            schema: Arc::new(Vec::new()),
        };

        while !response.job_complete {
            log::debug!("Waiting for BigQuery job {}", job_reference.job_id);
            async_std::task::sleep(POLL_INTERVAL).await;
            response = fetcher.fetch(None).await?;
        }

        let schema = response.schema.take().map(|s| s.fields).unwrap_or_default();
        fetcher.schema = Arc::new(schema);

        let total_rows = match &response.total_rows {
            Some(total_rows) => total_rows.parse::<u64>()?,
            None => 0,
        };
        log::info!("Total rows from BigQuery: {total_rows}");

        let first_rows = convert_rows(&fetcher.schema, std::mem::take(&mut response.rows))?;
        let cursor = PageCursor::First(first_rows, response.page_token.take());

        let pages = futures::stream::try_unfold(cursor, move |cursor| {
            next_page(fetcher.clone(), cursor)
        });

        let rows = pages
            .map_ok(|rows| futures::stream::iter(rows.into_iter().map(Ok::<Row, MetricsError>)))
            .try_flatten()
            .boxed();

        Ok(QueryResult { total_rows, rows })
    }
}
