//! Call WebSocket route configuration

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::llm_websocket_handler;
use crate::middleware::connection_limit_middleware;
use crate::state::AppState;
use std::sync::Arc;

/// Create the call WebSocket router
///
/// # Endpoint
///
/// `GET /llm-websocket/{call_id}` - WebSocket upgrade for one platform call
///
/// The server sends `config` first, then answers the platform's
/// `interaction_type` frames (see [`crate::handlers::llm_ws`]).
///
/// Upgrades pass through the connection-limit middleware, which needs the
/// peer address: serve the app with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_llm_ws_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/llm-websocket/{call_id}", get(llm_websocket_handler))
        .layer(middleware::from_fn_with_state(
            state,
            connection_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}
