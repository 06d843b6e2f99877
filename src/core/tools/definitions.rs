//! Tools offered to the model and their typed arguments.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

use super::ToolError;
use crate::core::llm::ToolDefinition;

/// The closed set of tools the receptionist can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CheckAvailability,
    BookAppointment,
    CancelAppointment,
    EndCall,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::CheckAvailability,
        ToolName::BookAppointment,
        ToolName::CancelAppointment,
        ToolName::EndCall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CheckAvailability => "check_availability",
            ToolName::BookAppointment => "book_appointment",
            ToolName::CancelAppointment => "cancel_appointment",
            ToolName::EndCall => "end_call",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            ToolName::CheckAvailability => "Verificar disponibilidad de citas en fechas específicas",
            ToolName::BookAppointment => {
                "Agendar una cita dental después de verificar disponibilidad"
            }
            ToolName::CancelAppointment => "Cancelar una cita existente",
            ToolName::EndCall => {
                "Finalizar la llamada solo cuando el paciente lo solicite explícitamente"
            }
        }
    }

    fn parameters(&self) -> Value {
        match self {
            ToolName::CheckAvailability => json!({
                "type": "object",
                "properties": {
                    "date": {
                        "type": "string",
                        "description": "Fecha solicitada en formato YYYY-MM-DD"
                    },
                    "time": {
                        "type": "string",
                        "description": "Hora preferida en formato HH:MM"
                    },
                    "service_type": {
                        "type": "string",
                        "description": "Tipo de consulta: general, limpieza, endodoncia, ortodoncia, implante"
                    }
                },
                "required": ["date"]
            }),
            ToolName::BookAppointment => json!({
                "type": "object",
                "properties": {
                    "patient_name": {
                        "type": "string",
                        "description": "Nombre completo del paciente"
                    },
                    "phone": {
                        "type": "string",
                        "description": "Teléfono de contacto del paciente"
                    },
                    "date": {
                        "type": "string",
                        "description": "Fecha de la cita en formato YYYY-MM-DD"
                    },
                    "time": {
                        "type": "string",
                        "description": "Hora de la cita en formato HH:MM"
                    },
                    "service_type": {
                        "type": "string",
                        "description": "Tipo de consulta solicitada"
                    },
                    "is_new_patient": {
                        "type": "boolean",
                        "description": "Si es un paciente nuevo o existente"
                    }
                },
                "required": ["patient_name", "phone", "date", "time", "service_type"]
            }),
            ToolName::CancelAppointment => json!({
                "type": "object",
                "properties": {
                    "patient_name": {
                        "type": "string",
                        "description": "Nombre del paciente"
                    },
                    "phone": {
                        "type": "string",
                        "description": "Teléfono del paciente para verificar identidad"
                    },
                    "appointment_date": {
                        "type": "string",
                        "description": "Fecha de la cita a cancelar"
                    }
                },
                "required": ["patient_name", "phone"]
            }),
            ToolName::EndCall => json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Mensaje de despedida antes de finalizar la llamada"
                    }
                },
                "required": ["message"]
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarations sent with every completion request, in a fixed order.
pub fn declared_tools() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub patient_name: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub service_type: String,
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_new_patient: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRequest {
    pub patient_name: String,
    pub phone: String,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub appointment_date: Option<String>,
}

/// Optional argument fields tolerate the loose typing models produce.
///
/// A value of the wrong shape is dropped rather than failing the whole call.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Accepts booleans and yes/no words in Spanish or English.
    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(b) => Some(b),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "si" | "sí" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct EndCallArgs {
    message: String,
}

/// A tool call that is executed against the business webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum BusinessAction {
    CheckAvailability(AvailabilityQuery),
    BookAppointment(BookingRequest),
    CancelAppointment(CancellationRequest),
}

impl BusinessAction {
    pub fn name(&self) -> ToolName {
        match self {
            BusinessAction::CheckAvailability(_) => ToolName::CheckAvailability,
            BusinessAction::BookAppointment(_) => ToolName::BookAppointment,
            BusinessAction::CancelAppointment(_) => ToolName::CancelAppointment,
        }
    }
}

/// A decoded tool invocation with typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Business(BusinessAction),
    /// Handled by the conversation itself; never reaches the webhook.
    EndCall { message: String },
}

impl ToolCall {
    /// Decode the arguments the model supplied for `name`.
    pub fn decode(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        let tool = ToolName::parse(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let invalid = |e: serde_json::Error| ToolError::InvalidArguments {
            tool: tool.as_str(),
            reason: e.to_string(),
        };

        let action = match tool {
            ToolName::CheckAvailability => BusinessAction::CheckAvailability(
                AvailabilityQuery::deserialize(arguments).map_err(invalid)?,
            ),
            ToolName::BookAppointment => BusinessAction::BookAppointment(
                BookingRequest::deserialize(arguments).map_err(invalid)?,
            ),
            ToolName::CancelAppointment => BusinessAction::CancelAppointment(
                CancellationRequest::deserialize(arguments).map_err(invalid)?,
            ),
            ToolName::EndCall => {
                return Ok(ToolCall::EndCall {
                    message: EndCallArgs::deserialize(arguments).map_err(invalid)?.message,
                });
            }
        };
        Ok(ToolCall::Business(action))
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::Business(action) => action.name(),
            ToolCall::EndCall { .. } => ToolName::EndCall,
        }
    }
}
