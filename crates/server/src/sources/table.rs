//! Records from a table in the service database

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde_json::{Number, Value};
use template::Record;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AppError, AppResult};
use crate::models::schema_admin::{quote_ident, table_exists, validate_identifier};

pub const DEFAULT_LIMIT: usize = 500;

/// Convert a SQLite value to JSON; blobs become base64 strings
pub fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(STANDARD.encode(bytes)),
    }
}

/// Convert a JSON value to a SQLite value; arrays and objects are stored as JSON text
pub fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Read up to `limit` rows of `table` as records
pub fn read_table(conn: &Connection, table: &str, limit: usize) -> AppResult<Vec<Record>> {
    validate_identifier(table)?;
    if !table_exists(conn, table)? {
        return Err(AppError::NotFound(format!("table '{table}' not found")));
    }

    let mut stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT ?1", quote_ident(table)))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let records = stmt
        .query_map([limit as i64], |row| {
            let mut record = Record::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), sql_to_json(row.get_ref(idx)?));
            }
            Ok(record)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(records)
}
