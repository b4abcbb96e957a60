use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::AppState;

/// Health check endpoint for monitoring and load balancing
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = state
        .pool
        .get()
        .map_err(|e| e.to_string())
        .and_then(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| e.to_string())
        })
        .is_ok();

    Json(serde_json::json!({
        "status": if database { "ok" } else { "degraded" },
        "service": "docfill",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "erp_configured": state.erp.is_some(),
        "ghostscript": state.config.ghostscript.is_some(),
    }))
}
