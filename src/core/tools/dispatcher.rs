use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::ToolError;
use super::definitions::{BusinessAction, ToolName};
use crate::config::ToolSettings;

/// Result reported when no business webhook is configured.
pub const CONFIGURATION_APOLOGY: &str = "Error de configuración del sistema";

/// Result reported for a tool name outside the declared set.
pub const UNRECOGNIZED_TOOL_RESULT: &str = "Función no reconocida";

#[derive(Debug, Deserialize)]
struct WebhookReply {
    #[serde(default)]
    message: Option<String>,
}

/// Executes business tools against the downstream webhook.
///
/// Every outcome is a string meant to be read back to the model: the
/// webhook's `message`, a per-tool default on success, or a per-tool apology
/// on failure. Errors never escape [`ToolDispatcher::execute`].
pub struct ToolDispatcher {
    client: reqwest::Client,
    webhook_url: Option<String>,
    settings: ToolSettings,
}

impl ToolDispatcher {
    pub fn new(webhook_url: Option<String>, settings: ToolSettings) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ToolError::Request(e.to_string()))?;
        Ok(Self {
            client,
            webhook_url: webhook_url.filter(|url| !url.trim().is_empty()),
            settings,
        })
    }

    /// Run `action` and return the text to hand back to the model.
    pub async fn execute(&self, action: &BusinessAction) -> String {
        let tool = action.name();
        match self.dispatch(action).await {
            Ok(result) => {
                info!(tool = %tool, "Tool call completed");
                result
            }
            Err(ToolError::NotConfigured) => {
                warn!(tool = %tool, "Business webhook URL is not configured");
                CONFIGURATION_APOLOGY.to_string()
            }
            Err(e) => {
                warn!(tool = %tool, error = %e, "Tool call failed");
                failure_message(action).to_string()
            }
        }
    }

    async fn dispatch(&self, action: &BusinessAction) -> Result<String, ToolError> {
        let tool = action.name();
        let payload = match action {
            BusinessAction::CheckAvailability(args) => action_payload(tool, args)?,
            BusinessAction::BookAppointment(args) => action_payload(tool, args)?,
            BusinessAction::CancelAppointment(args) => action_payload(tool, args)?,
        };

        let url = self.webhook_url.as_deref().ok_or(ToolError::NotConfigured)?;
        let timeout = self.timeout_for(action);

        debug!(tool = %tool, url = %url, timeout_ms = timeout.as_millis() as u64, "Posting tool call");

        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout {
                        tool: tool.as_str(),
                        after: timeout,
                    }
                } else {
                    ToolError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::Timeout {
                    tool: tool.as_str(),
                    after: timeout,
                }
            } else {
                ToolError::Request(e.to_string())
            }
        })?;

        let message = serde_json::from_slice::<WebhookReply>(&body)
            .ok()
            .and_then(|reply| reply.message)
            .filter(|message| !message.is_empty());

        Ok(message.unwrap_or_else(|| success_message(action).to_string()))
    }

    fn timeout_for(&self, action: &BusinessAction) -> Duration {
        match action {
            BusinessAction::BookAppointment(_) => {
                Duration::from_millis(self.settings.booking_timeout_ms)
            }
            BusinessAction::CheckAvailability(_) | BusinessAction::CancelAppointment(_) => {
                Duration::from_millis(self.settings.lookup_timeout_ms)
            }
        }
    }
}

fn action_payload<T: serde::Serialize>(tool: ToolName, args: &T) -> Result<Value, ToolError> {
    let mut payload = serde_json::to_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.as_str(),
        reason: e.to_string(),
    })?;
    match payload.as_object_mut() {
        Some(fields) => {
            fields.insert("action".to_string(), Value::String(tool.as_str().to_string()));
            Ok(payload)
        }
        None => Err(ToolError::InvalidArguments {
            tool: tool.as_str(),
            reason: "arguments are not an object".to_string(),
        }),
    }
}

fn success_message(action: &BusinessAction) -> &'static str {
    match action {
        BusinessAction::CheckAvailability(_) => "Disponibilidad verificada",
        BusinessAction::BookAppointment(_) => "Cita agendada exitosamente",
        BusinessAction::CancelAppointment(_) => "Cita cancelada exitosamente",
    }
}

fn failure_message(action: &BusinessAction) -> &'static str {
    match action {
        BusinessAction::CheckAvailability(_) => {
            "No pude verificar la disponibilidad en este momento. Un momento por favor."
        }
        BusinessAction::BookAppointment(_) => {
            "Hubo un problema al agendar la cita. Un momento por favor."
        }
        BusinessAction::CancelAppointment(_) => {
            "No pude cancelar la cita en este momento. Un momento por favor."
        }
    }
}
