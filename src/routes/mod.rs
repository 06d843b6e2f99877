pub mod api;
pub mod llm_ws;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// All application routes with state applied
///
/// Cross-cutting layers (CORS, rate limiting, security headers) are added
/// by the binary.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(llm_ws::create_llm_ws_router(state.clone()))
        .with_state(state)
}
