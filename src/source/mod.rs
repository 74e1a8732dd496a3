//! Analytical sources the refresh jobs read from.
//!
//! A source runs a query text against a project and hands back the total row
//! count up front plus a lazy stream of typed rows.

use crate::metrics::error::MetricsError;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::BoxStream;
use std::collections::HashMap;

pub mod bigquery;
pub mod memory;

pub use bigquery::BigQuerySource;
pub use memory::MemorySource;

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    Date(NaiveDate),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A result row, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insert, mostly for tests.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        self.fields.insert(column.to_owned(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    fn require(&self, column: &str) -> Result<&Value, MetricsError> {
        self.fields
            .get(column)
            .ok_or_else(|| MetricsError::MissingColumn(column.to_owned()))
    }

    fn type_error(column: &str, expected: &'static str) -> MetricsError {
        MetricsError::ColumnType {
            column: column.to_owned(),
            expected,
        }
    }

    /// Reads a string column. Integers are accepted and formatted, since ids
    /// come back as either depending on the query.
    pub fn get_string(&self, column: &str) -> Result<String, MetricsError> {
        match self.require(column)? {
            Value::String(value) => Ok(value.clone()),
            Value::Integer(value) => Ok(value.to_string()),
            _ => Err(Self::type_error(column, "string")),
        }
    }

    /// Like [`Row::get_string`] but a null or absent column is `None`.
    pub fn get_optional_string(&self, column: &str) -> Result<Option<String>, MetricsError> {
        match self.fields.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get_string(column).map(Some),
        }
    }

    /// Reads a non-negative integer column.
    pub fn get_count(&self, column: &str) -> Result<u64, MetricsError> {
        match self.require(column)? {
            Value::Integer(value) => {
                u64::try_from(*value).map_err(|_| MetricsError::NegativeCount(column.to_owned()))
            }
            _ => Err(Self::type_error(column, "integer")),
        }
    }

    pub fn get_date(&self, column: &str) -> Result<NaiveDate, MetricsError> {
        match self.require(column)? {
            Value::Date(value) => Ok(*value),
            _ => Err(Self::type_error(column, "date")),
        }
    }
}

/// The outcome of a query: the row count is known before any row is read.
pub struct QueryResult {
    pub total_rows: u64,
    pub rows: BoxStream<'static, Result<Row, MetricsError>>,
}

/// Trait defining the analytical source interface
#[async_trait]
pub trait AnalyticalSource: Send + Sync {
    /// Runs `query` in `project` and returns its rows lazily.
    async fn run_query(&self, project: &str, query: &str) -> Result<QueryResult, MetricsError>;
}
