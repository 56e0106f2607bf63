//! Row access for the relational style store.
//!
//! The loader asks for exactly one row per component: a fixed column list
//! from one table, addressed by integer id. [`TableQuery::to_sql`] renders
//! the statement a database-backed [`RowSource`] runs.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query '{query}' failed: {message}")]
    Query { query: String, message: String },

    #[error("Column '{column}' holds an unexpected value: {message}")]
    Column { column: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Int(n)
    }
}

impl From<i32> for SqlValue {
    fn from(n: i32) -> Self {
        SqlValue::Int(i64::from(n))
    }
}

impl From<f64> for SqlValue {
    fn from(n: f64) -> Self {
        SqlValue::Double(n)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

/// One result row. Absent columns read as SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.values.insert(column.to_string(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> &SqlValue {
        self.values.get(column).unwrap_or(&SqlValue::Null)
    }

    fn unexpected(column: &str, value: &SqlValue, wanted: &str) -> RowError {
        RowError::Column {
            column: column.to_string(),
            message: format!("expected {}, got {:?}", wanted, value),
        }
    }

    pub fn get_f64(&self, column: &str) -> Result<Option<f64>, RowError> {
        match self.get(column) {
            SqlValue::Null => Ok(None),
            SqlValue::Double(d) => Ok(Some(*d)),
            SqlValue::Int(i) => Ok(Some(*i as f64)),
            other => Err(Self::unexpected(column, other, "a number")),
        }
    }

    pub fn get_i32(&self, column: &str) -> Result<Option<i32>, RowError> {
        match self.get(column) {
            SqlValue::Null => Ok(None),
            SqlValue::Int(i) => i32::try_from(*i)
                .map(Some)
                .map_err(|_| Self::unexpected(column, &SqlValue::Int(*i), "a 32 bit integer")),
            other => Err(Self::unexpected(column, other, "an integer")),
        }
    }

    pub fn get_str(&self, column: &str) -> Result<Option<&str>, RowError> {
        match self.get(column) {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s.as_str())),
            other => Err(Self::unexpected(column, other, "text")),
        }
    }

    pub fn get_bool(&self, column: &str) -> Result<Option<bool>, RowError> {
        match self.get(column) {
            SqlValue::Null => Ok(None),
            SqlValue::Bool(b) => Ok(Some(*b)),
            SqlValue::Int(i) => Ok(Some(*i != 0)),
            other => Err(Self::unexpected(column, other, "a boolean")),
        }
    }
}

/// A single-row lookup by primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableQuery<'a> {
    pub schema: Option<&'a str>,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub id: i32,
}

impl TableQuery<'_> {
    /// The parameterized statement for this lookup; the id binds to `$1`.
    pub fn to_sql(&self) -> String {
        let table = match self.schema {
            Some(schema) if !schema.is_empty() => format!("{}.{}", schema, self.table),
            _ => self.table.to_string(),
        };
        format!("select {} from {} where id = $1", self.columns.join(", "), table)
    }
}

/// A source of style table rows.
pub trait RowSource: Send + Sync + Debug {
    /// Returns the row with `query.id`, or `None` if the table has none.
    fn fetch(&self, query: &TableQuery<'_>) -> Result<Option<Row>, RowError>;

    /// Returns a human-readable name for this source (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// Tables held in memory. Fetches project the stored row onto the queried
/// columns and are counted, so callers can observe how often a component is
/// actually read.
#[derive(Debug, Default)]
pub struct InMemoryRowSource {
    tables: RwLock<HashMap<String, HashMap<i32, Row>>>,
    fetches: AtomicUsize,
}

impl InMemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, table: &str, id: i32, row: Row) -> Result<(), RowError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| RowError::Connection("row store lock poisoned".to_string()))?;
        tables.entry(table.to_string()).or_default().insert(id, row);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert) for fixtures.
    pub fn with(self, table: &str, id: i32, row: Row) -> Self {
        if let Ok(mut tables) = self.tables.write() {
            tables.entry(table.to_string()).or_default().insert(id, row);
        }
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl RowSource for InMemoryRowSource {
    fn fetch(&self, query: &TableQuery<'_>) -> Result<Option<Row>, RowError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let tables = self
            .tables
            .read()
            .map_err(|_| RowError::Connection("row store lock poisoned".to_string()))?;
        let Some(row) = tables.get(query.table).and_then(|t| t.get(&query.id)) else {
            return Ok(None);
        };
        let mut projected = Row::new();
        for column in query.columns {
            projected = projected.with(column, row.get(column).clone());
        }
        Ok(Some(projected))
    }

    fn name(&self) -> &'static str {
        "InMemoryRowSource"
    }
}
