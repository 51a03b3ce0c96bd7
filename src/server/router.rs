//! Router builder for the bridge routes

use super::handler::{BridgeState, handle_websocket_events};
use axum::{Json, Router, routing::get, routing::post};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the bridge routes
///
/// - POST / - WebSocket-Over-HTTP event stream from the proxy
/// - GET /health - Liveness probe
pub fn build_bridge_routes(state: BridgeState) -> Router {
    Router::new()
        .route("/", post(handle_websocket_events))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
