mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use tower_http::trace::TraceLayer;

use crate::mcp::McpServer;
use crate::tracker::Tracker;

/// HTTP surface: MCP over streamable HTTP at `/mcp`, plus read-only JSON
/// views under `/api/v1`.
pub fn create_router(tracker: Tracker) -> Router {
    let server = McpServer::new(tracker);

    let mcp_server = server.clone();
    let mcp_service = StreamableHttpService::new(
        move || Ok(mcp_server.clone()),
        Arc::new(LocalSessionManager::default()),
        Default::default(),
    );

    let api = Router::new()
        .route("/status", get(handlers::get_status))
        .route("/history", get(handlers::get_history))
        .route("/settings", get(handlers::get_settings))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(handlers::health))
        .with_state(server)
        .nest_service("/mcp", mcp_service)
        .layer(TraceLayer::new_for_http())
}
