//! # docfill-server
//!
//! HTTP service that stores PDF templates with data-bound field maps and
//! fills them from posted JSON, database tables, spreadsheet imports or
//! ERPNext, one document at a time or in bulk.

pub mod bulk;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod render;
pub mod sources;
pub mod state;
pub mod storage;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorResponse};
pub use state::AppState;

use handlers::{bulk as bulk_handlers, database, erp, fields, health, imports, submissions, templates};

/// Build the application router with all routes configured
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    let api = Router::new()
        .route("/health", get(health::health_check))
        // Templates
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/{key}",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/templates/{key}/pdf", get(templates::template_pdf))
        .route("/templates/{key}/pages", get(templates::template_pages))
        .route("/templates/{key}/source", put(templates::set_data_source))
        .route("/templates/{key}/records", get(templates::template_records))
        .route("/templates/{key}/preview", post(templates::preview))
        .route("/templates/{key}/generate", post(templates::generate))
        // Field editor
        .route("/templates/{key}/fields", put(fields::replace_fields))
        .route(
            "/templates/{key}/fields/{name}",
            put(fields::upsert_field).delete(fields::delete_field),
        )
        .route(
            "/templates/{key}/fields/{name}/position",
            post(fields::move_field),
        )
        .route("/templates/{key}/images", put(fields::replace_images))
        // Imports
        .route(
            "/templates/{key}/imports",
            get(imports::list_imports).post(imports::upload_import),
        )
        .route(
            "/imports/{id}",
            get(imports::get_import).delete(imports::delete_import),
        )
        // Bulk
        .route("/templates/{key}/bulk", post(bulk_handlers::run_bulk))
        .route("/bulk/{session}", get(bulk_handlers::get_session))
        .route("/bulk/{session}/files/{index}", get(bulk_handlers::view_file))
        .route(
            "/bulk/{session}/files/{index}/download",
            get(bulk_handlers::download_file),
        )
        .route("/bulk/{session}/zip", get(bulk_handlers::download_zip))
        // Submissions
        .route(
            "/submissions",
            get(submissions::list_submissions).post(submissions::create_submission),
        )
        .route(
            "/submissions/{id}",
            get(submissions::get_submission)
                .put(submissions::update_submission)
                .delete(submissions::delete_submission),
        )
        .route("/submissions/{id}/pdf", get(submissions::submission_pdf))
        // ERP
        .route("/erp/status", get(erp::status))
        .route("/erp/doctypes/{doctype}", get(erp::list_documents))
        .route("/erp/doctypes/{doctype}/{name}", get(erp::get_document))
        .route("/erp/reports/{report}", get(erp::run_report))
        .route("/templates/{key}/erp/{name}", post(erp::render_document))
        // Schema editor
        .route(
            "/database/tables",
            get(database::list_tables).post(database::create_table),
        )
        .route(
            "/database/tables/{table}",
            get(database::describe_table).delete(database::drop_table),
        )
        .route("/database/tables/{table}/rename", post(database::rename_table))
        .route("/database/tables/{table}/columns", post(database::add_column))
        .route(
            "/database/tables/{table}/columns/{column}",
            put(database::rename_column).delete(database::drop_column),
        )
        .route(
            "/database/tables/{table}/rows",
            get(database::list_rows).post(database::insert_row),
        )
        .route(
            "/database/tables/{table}/rows/{rowid}",
            put(database::update_row).delete(database::delete_row),
        );

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
