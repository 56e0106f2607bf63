//! Style tables from JSON, for running the relational loader without a
//! database.

use crate::error::SymbologyError;
use serde_json::Value;
use symbology_traits::{InMemoryRowSource, Row, SqlValue};

/// Builds a row source from `{"<table>": {"<id>": {"<column>": value}}}`.
pub fn row_source_from_json(value: &Value) -> Result<InMemoryRowSource, SymbologyError> {
    let tables = value
        .as_object()
        .ok_or_else(|| SymbologyError::Input("expected an object of tables".to_string()))?;

    let mut source = InMemoryRowSource::new();
    for (table, rows) in tables {
        let rows = rows
            .as_object()
            .ok_or_else(|| SymbologyError::Input(format!("table '{}' is not an object of rows", table)))?;
        for (id, columns) in rows {
            let id: i32 = id
                .parse()
                .map_err(|_| SymbologyError::Input(format!("row id '{}' of table '{}' is not an integer", id, table)))?;
            let columns = columns
                .as_object()
                .ok_or_else(|| SymbologyError::Input(format!("row {} of table '{}' is not an object", id, table)))?;
            let mut row = Row::new();
            for (column, value) in columns {
                row = row.with(column, sql_value(value));
            }
            source = source.with(table, id, row);
        }
    }
    log::debug!("Loaded {} style tables", tables.len());
    Ok(source)
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Int(i),
            None => SqlValue::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}
