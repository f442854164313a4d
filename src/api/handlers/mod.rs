use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::PomodoroError;
use crate::mcp::*;

// ============================================================
// Error Handling
// ============================================================

/// Map a failed read to a response. Storage and config details are logged
/// server-side; the client gets the error kind only.
fn internal_error(e: PomodoroError) -> (StatusCode, String) {
    tracing::error!(kind = e.kind(), "Internal error: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.kind().to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Read-only views
// ============================================================

pub async fn get_status(
    State(server): State<McpServer>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    server.status_report().map(Json).map_err(internal_error)
}

/// Query parameters for listing history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

pub async fn get_history(
    State(server): State<McpServer>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let req = GetHistoryRequest {
        limit: query.limit.map(|l| l as f64),
    };
    server.history_report(&req).map(Json).map_err(internal_error)
}

pub async fn get_settings(
    State(server): State<McpServer>,
) -> Result<Json<SettingsResponse>, (StatusCode, String)> {
    server.settings_report().map(Json).map_err(internal_error)
}
