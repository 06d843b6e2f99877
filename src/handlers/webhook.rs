//! Call lifecycle notifications
//!
//! The platform POSTs `call_started`, `call_ended` and `call_analyzed`
//! events to `/webhook`, signed with the account API key. They are
//! verified and logged; nothing else is done with them.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;
use crate::utils::{SIGNATURE_HEADER, verify_signature};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    CallStarted,
    CallEnded,
    CallAnalyzed,
    Other(String),
}

impl LifecycleEvent {
    pub fn parse(event: &str) -> Self {
        match event {
            "call_started" => Self::CallStarted,
            "call_ended" => Self::CallEnded,
            "call_analyzed" => Self::CallAnalyzed,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LifecycleNotification {
    #[serde(default)]
    pub event: String,
    #[serde(default, alias = "data")]
    pub call: Option<CallSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CallSummary {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

impl LifecycleNotification {
    pub fn event(&self) -> LifecycleEvent {
        LifecycleEvent::parse(&self.event)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.call.as_ref().and_then(|call| call.call_id.as_deref())
    }
}

/// `POST /webhook`
///
/// The signature covers the raw body bytes, so the body is verified before
/// it is parsed.
pub async fn lifecycle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if let Err(e) = verify_signature(&body, &state.config.retell_api_key, signature) {
        warn!(error = %e, "Rejected lifecycle notification");
        return Err(AppError::InvalidSignature);
    }

    let notification: LifecycleNotification = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid notification body: {e}")))?;
    let call_id = notification.call_id().unwrap_or("<unknown>");

    match notification.event() {
        LifecycleEvent::CallStarted => info!(call_id, "Call started"),
        LifecycleEvent::CallEnded => info!(call_id, "Call ended"),
        LifecycleEvent::CallAnalyzed => info!(call_id, "Call analyzed"),
        LifecycleEvent::Other(event) => warn!(call_id, event = %event, "Unknown lifecycle event"),
    }

    Ok(Json(json!({ "received": true })))
}
