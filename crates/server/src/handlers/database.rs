//! Generic schema editor over the service database

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::AppResult;
use crate::models::schema_admin::{
    self, ColumnDef, CreateTable, RowPage, TableDescription, TableInfo,
};
use crate::state::AppState;

const DEFAULT_PER_PAGE: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RowsQuery {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

/// GET /api/database/tables
pub async fn list_tables(State(state): State<AppState>) -> AppResult<Json<Vec<TableInfo>>> {
    let conn = state.pool.get()?;
    Ok(Json(schema_admin::list_tables(&conn)?))
}

/// POST /api/database/tables
pub async fn create_table(
    State(state): State<AppState>,
    Json(def): Json<CreateTable>,
) -> AppResult<Response> {
    let conn = state.pool.get()?;
    let table = schema_admin::create_table(&conn, &def)?;
    Ok((StatusCode::CREATED, Json(table)).into_response())
}

/// GET /api/database/tables/{table}
pub async fn describe_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> AppResult<Json<TableDescription>> {
    let conn = state.pool.get()?;
    Ok(Json(schema_admin::describe(&conn, &table)?))
}

/// DELETE /api/database/tables/{table}
pub async fn drop_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.pool.get()?;
    schema_admin::drop_table(&conn, &table)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/database/tables/{table}/rename
pub async fn rename_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(request): Json<RenameRequest>,
) -> AppResult<Json<TableDescription>> {
    let conn = state.pool.get()?;
    Ok(Json(schema_admin::rename_table(&conn, &table, &request.new_name)?))
}

/// POST /api/database/tables/{table}/columns
pub async fn add_column(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(column): Json<ColumnDef>,
) -> AppResult<Response> {
    let conn = state.pool.get()?;
    let description = schema_admin::add_column(&conn, &table, &column)?;
    Ok((StatusCode::CREATED, Json(description)).into_response())
}

/// PUT /api/database/tables/{table}/columns/{column}
pub async fn rename_column(
    State(state): State<AppState>,
    Path((table, column)): Path<(String, String)>,
    Json(request): Json<RenameRequest>,
) -> AppResult<Json<TableDescription>> {
    let conn = state.pool.get()?;
    Ok(Json(schema_admin::rename_column(
        &conn,
        &table,
        &column,
        &request.new_name,
    )?))
}

/// DELETE /api/database/tables/{table}/columns/{column}
pub async fn drop_column(
    State(state): State<AppState>,
    Path((table, column)): Path<(String, String)>,
) -> AppResult<Json<TableDescription>> {
    let conn = state.pool.get()?;
    Ok(Json(schema_admin::drop_column(&conn, &table, &column)?))
}

/// GET /api/database/tables/{table}/rows
pub async fn list_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): Query<RowsQuery>,
) -> AppResult<Json<RowPage>> {
    let conn = state.pool.get()?;
    Ok(Json(schema_admin::list_rows(
        &conn,
        &table,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )?))
}

/// POST /api/database/tables/{table}/rows
pub async fn insert_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(row): Json<Map<String, Value>>,
) -> AppResult<Response> {
    let conn = state.pool.get()?;
    let rowid = schema_admin::insert_row(&conn, &table, &row)?;
    Ok((StatusCode::CREATED, Json(json!({ "rowid": rowid }))).into_response())
}

/// PUT /api/database/tables/{table}/rows/{rowid}
pub async fn update_row(
    State(state): State<AppState>,
    Path((table, rowid)): Path<(String, i64)>,
    Json(row): Json<Map<String, Value>>,
) -> AppResult<Json<Value>> {
    let conn = state.pool.get()?;
    schema_admin::update_row(&conn, &table, rowid, &row)?;
    Ok(Json(json!({ "rowid": rowid })))
}

/// DELETE /api/database/tables/{table}/rows/{rowid}
pub async fn delete_row(
    State(state): State<AppState>,
    Path((table, rowid)): Path<(String, i64)>,
) -> AppResult<StatusCode> {
    let conn = state.pool.get()?;
    schema_admin::delete_row(&conn, &table, rowid)?;
    Ok(StatusCode::NO_CONTENT)
}
