//! Generic table and row editing over the service database
//!
//! Identifiers are validated and then double-quoted; values always go
//! through bound parameters. The service's own tables are read-only here.

use regex::Regex;
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::db::SERVICE_TABLES;
use crate::error::{AppError, AppResult};
use crate::sources::table::{json_to_sql, sql_to_json};

pub const ALLOWED_TYPES: [&str; 8] = [
    "INTEGER", "REAL", "TEXT", "BLOB", "NUMERIC", "BOOLEAN", "DATE", "DATETIME",
];

const MAX_PER_PAGE: usize = 500;

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"))
}

pub fn validate_identifier(name: &str) -> AppResult<()> {
    if identifier_regex().is_match(name) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "invalid identifier {name:?}: use letters, digits and '_', not starting with a digit"
        )))
    }
}

/// Quote an identifier for SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn is_protected(table: &str) -> bool {
    let lower = table.to_ascii_lowercase();
    lower.starts_with("sqlite_") || SERVICE_TABLES.contains(&lower.as_str())
}

fn ensure_writable(table: &str) -> AppResult<()> {
    validate_identifier(table)?;
    if is_protected(table) {
        return Err(AppError::Validation(format!(
            "table '{table}' is managed by the service and is read-only"
        )));
    }
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn require_table(conn: &Connection, table: &str) -> AppResult<()> {
    validate_identifier(table)?;
    if !table_exists(conn, table)? {
        return Err(AppError::NotFound(format!("table '{table}' not found")));
    }
    Ok(())
}

/// Run a statement built from user input; SQLite rejections are user errors
fn execute_user_sql(conn: &Connection, sql: &str, values: &[rusqlite::types::Value]) -> AppResult<usize> {
    conn.execute(sql, params_from_iter(values.iter()))
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => AppError::Validation(msg),
            other => AppError::Db(other),
        })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableInfo {
    pub name: String,
    pub row_count: i64,
    pub protected: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub primary_key: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableDescription {
    pub name: String,
    pub protected: bool,
    pub row_count: i64,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

impl ColumnDef {
    fn validate(&self) -> AppResult<String> {
        validate_identifier(&self.name)?;
        let column_type = self.column_type.trim().to_ascii_uppercase();
        if !ALLOWED_TYPES.contains(&column_type.as_str()) {
            return Err(AppError::Validation(format!(
                "unsupported column type {:?}; allowed: {}",
                self.column_type,
                ALLOWED_TYPES.join(", ")
            )));
        }
        Ok(column_type)
    }

    /// Column definition SQL without the primary key clause
    fn to_sql(&self) -> AppResult<String> {
        let column_type = self.validate()?;
        let mut sql = format!("{} {column_type}", quote_ident(&self.name));
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default_literal(default)?);
        }
        Ok(sql)
    }
}

fn default_literal(value: &Value) -> AppResult<String> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(quote_literal(s)),
        _ => Err(AppError::Validation(
            "column defaults must be scalar values".to_string(),
        )),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowPage {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub total: i64,
    pub page: usize,
    pub per_page: usize,
}

fn row_count(conn: &Connection, table: &str) -> AppResult<i64> {
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn list_tables(conn: &Connection) -> AppResult<Vec<TableInfo>> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    names
        .into_iter()
        .map(|name| {
            Ok(TableInfo {
                row_count: row_count(conn, &name)?,
                protected: is_protected(&name),
                name,
            })
        })
        .collect()
}

fn columns_of(conn: &Connection, table: &str) -> AppResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                column_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                default: row.get(4)?,
                primary_key: row.get::<_, i64>(5)? != 0,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

pub fn describe(conn: &Connection, table: &str) -> AppResult<TableDescription> {
    require_table(conn, table)?;
    Ok(TableDescription {
        name: table.to_string(),
        protected: is_protected(table),
        row_count: row_count(conn, table)?,
        columns: columns_of(conn, table)?,
    })
}

pub fn create_table(conn: &Connection, def: &CreateTable) -> AppResult<TableDescription> {
    ensure_writable(&def.name)?;
    if table_exists(conn, &def.name)? {
        return Err(AppError::Validation(format!("table '{}' already exists", def.name)));
    }
    if def.columns.is_empty() {
        return Err(AppError::Validation("a table needs at least one column".to_string()));
    }

    let mut seen = HashSet::new();
    let mut parts = Vec::with_capacity(def.columns.len() + 1);
    let mut primary_keys = Vec::new();
    for column in &def.columns {
        if !seen.insert(column.name.to_ascii_lowercase()) {
            return Err(AppError::Validation(format!("duplicate column '{}'", column.name)));
        }
        parts.push(column.to_sql()?);
        if column.primary_key {
            primary_keys.push(quote_ident(&column.name));
        }
    }
    if !primary_keys.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", primary_keys.join(", ")));
    }

    let sql = format!("CREATE TABLE {} ({})", quote_ident(&def.name), parts.join(", "));
    execute_user_sql(conn, &sql, &[])?;
    tracing::info!(table = %def.name, "table created");
    describe(conn, &def.name)
}

pub fn rename_table(conn: &Connection, table: &str, new_name: &str) -> AppResult<TableDescription> {
    ensure_writable(table)?;
    ensure_writable(new_name)?;
    require_table(conn, table)?;
    if table_exists(conn, new_name)? {
        return Err(AppError::Validation(format!("table '{new_name}' already exists")));
    }

    let sql = format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_ident(table),
        quote_ident(new_name)
    );
    execute_user_sql(conn, &sql, &[])?;
    describe(conn, new_name)
}

pub fn drop_table(conn: &Connection, table: &str) -> AppResult<()> {
    ensure_writable(table)?;
    require_table(conn, table)?;
    execute_user_sql(conn, &format!("DROP TABLE {}", quote_ident(table)), &[])?;
    tracing::info!(table = %table, "table dropped");
    Ok(())
}

pub fn add_column(conn: &Connection, table: &str, column: &ColumnDef) -> AppResult<TableDescription> {
    ensure_writable(table)?;
    require_table(conn, table)?;
    if column.primary_key {
        return Err(AppError::Validation(
            "primary key columns can only be declared when creating a table".to_string(),
        ));
    }
    if column.not_null && column.default.as_ref().map_or(true, Value::is_null) {
        return Err(AppError::Validation(
            "a NOT NULL column needs a non-null default".to_string(),
        ));
    }

    let sql = format!("ALTER TABLE {} ADD COLUMN {}", quote_ident(table), column.to_sql()?);
    execute_user_sql(conn, &sql, &[])?;
    describe(conn, table)
}

fn require_column(conn: &Connection, table: &str, column: &str) -> AppResult<()> {
    validate_identifier(column)?;
    let exists = columns_of(conn, table)?
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(column));
    if !exists {
        return Err(AppError::NotFound(format!(
            "column '{column}' not found in '{table}'"
        )));
    }
    Ok(())
}

pub fn rename_column(
    conn: &Connection,
    table: &str,
    column: &str,
    new_name: &str,
) -> AppResult<TableDescription> {
    ensure_writable(table)?;
    require_table(conn, table)?;
    require_column(conn, table, column)?;
    validate_identifier(new_name)?;

    let sql = format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        quote_ident(table),
        quote_ident(column),
        quote_ident(new_name)
    );
    execute_user_sql(conn, &sql, &[])?;
    describe(conn, table)
}

pub fn drop_column(conn: &Connection, table: &str, column: &str) -> AppResult<TableDescription> {
    ensure_writable(table)?;
    require_table(conn, table)?;
    require_column(conn, table, column)?;

    let sql = format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote_ident(table),
        quote_ident(column)
    );
    execute_user_sql(conn, &sql, &[])?;
    describe(conn, table)
}

pub fn list_rows(conn: &Connection, table: &str, page: usize, per_page: usize) -> AppResult<RowPage> {
    require_table(conn, table)?;
    let page = page.max(1);
    let per_page = per_page.clamp(1, MAX_PER_PAGE);
    let offset = (page - 1)
        .checked_mul(per_page)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| AppError::Validation(format!("page {page} is out of range")))?;

    let columns: Vec<String> = columns_of(conn, table)?.into_iter().map(|c| c.name).collect();
    let sql = format!(
        "SELECT rowid, * FROM {} ORDER BY rowid LIMIT ?1 OFFSET ?2",
        quote_ident(table)
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::Validation(format!("cannot list rows of '{table}': {e}")))?;

    let rows = stmt
        .query_map(params![per_page as i64, offset as i64], |row| {
            let mut map = Map::new();
            map.insert("rowid".to_string(), sql_to_json(row.get_ref(0)?));
            for (idx, name) in columns.iter().enumerate() {
                map.insert(name.clone(), sql_to_json(row.get_ref(idx + 1)?));
            }
            Ok(map)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(RowPage {
        table: table.to_string(),
        columns,
        rows,
        total: row_count(conn, table)?,
        page,
        per_page,
    })
}

/// Split a row object into quoted column names and bound values
fn row_values(
    conn: &Connection,
    table: &str,
    row: &Map<String, Value>,
) -> AppResult<(Vec<String>, Vec<rusqlite::types::Value>)> {
    let known: Vec<String> = columns_of(conn, table)?.into_iter().map(|c| c.name).collect();
    let mut names = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (name, value) in row {
        if name == "rowid" {
            continue;
        }
        if !known.iter().any(|k| k.eq_ignore_ascii_case(name)) {
            return Err(AppError::Validation(format!(
                "unknown column '{name}' in '{table}'"
            )));
        }
        names.push(quote_ident(name));
        values.push(json_to_sql(value));
    }

    Ok((names, values))
}

pub fn insert_row(conn: &Connection, table: &str, row: &Map<String, Value>) -> AppResult<i64> {
    ensure_writable(table)?;
    require_table(conn, table)?;
    let (names, values) = row_values(conn, table, row)?;

    let sql = if names.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table))
    } else {
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            names.join(", "),
            placeholders.join(", ")
        )
    };
    execute_user_sql(conn, &sql, &values)?;
    Ok(conn.last_insert_rowid())
}

pub fn update_row(
    conn: &Connection,
    table: &str,
    rowid: i64,
    row: &Map<String, Value>,
) -> AppResult<()> {
    ensure_writable(table)?;
    require_table(conn, table)?;
    let (names, mut values) = row_values(conn, table, row)?;
    if names.is_empty() {
        return Err(AppError::Validation("no columns to update".to_string()));
    }

    let assignments: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{name} = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE rowid = ?{}",
        quote_ident(table),
        assignments.join(", "),
        names.len() + 1
    );
    values.push(rusqlite::types::Value::Integer(rowid));

    if execute_user_sql(conn, &sql, &values)? == 0 {
        return Err(AppError::NotFound(format!("row {rowid} not found in '{table}'")));
    }
    Ok(())
}

pub fn delete_row(conn: &Connection, table: &str, rowid: i64) -> AppResult<()> {
    ensure_writable(table)?;
    require_table(conn, table)?;
    let sql = format!("DELETE FROM {} WHERE rowid = ?1", quote_ident(table));
    if execute_user_sql(conn, &sql, &[rusqlite::types::Value::Integer(rowid)])? == 0 {
        return Err(AppError::NotFound(format!("row {rowid} not found in '{table}'")));
    }
    Ok(())
}
