use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, webhook};
use crate::state::AppState;
use std::sync::Arc;

/// Public HTTP routes: service index, health check and the lifecycle webhook
///
/// The webhook authenticates each request by signature, so none of these
/// routes sit behind extra middleware.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::service_index))
        .route("/health", get(api::health_check))
        .route("/webhook", post(webhook::lifecycle_webhook))
        .layer(TraceLayer::new_for_http())
}
