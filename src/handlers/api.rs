use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

pub const SERVICE_NAME: &str = "Retell AI - Clínica Dental";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceIndex {
    pub message: String,
    pub status: &'static str,
    pub endpoints: Endpoints,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub websocket: &'static str,
    pub webhook: &'static str,
    pub health: &'static str,
}

/// `GET /health`
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        timestamp: rfc3339_now(),
    })
}

/// `GET /` lists the public endpoints.
pub async fn service_index() -> Json<ServiceIndex> {
    Json(ServiceIndex {
        message: format!("{SERVICE_NAME} funcionando correctamente"),
        status: "ok",
        endpoints: Endpoints {
            websocket: "/llm-websocket/{call_id}",
            webhook: "/webhook",
            health: "/health",
        },
        timestamp: rfc3339_now(),
    })
}

fn rfc3339_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
