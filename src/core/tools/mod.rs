//! Business tools the model can invoke mid-conversation.
//!
//! `definitions` holds the declarations sent to the model and the typed
//! argument shapes; `dispatcher` executes them against the business webhook.

pub mod definitions;
pub mod dispatcher;

use std::time::Duration;
use thiserror::Error;

pub use definitions::{
    AvailabilityQuery, BookingRequest, BusinessAction, CancellationRequest, ToolCall, ToolName,
    declared_tools,
};
pub use dispatcher::{CONFIGURATION_APOLOGY, ToolDispatcher, UNRECOGNIZED_TOOL_RESULT};

/// Errors raised while decoding or executing a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },

    #[error("Business webhook URL is not configured")]
    NotConfigured,

    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: &'static str, after: Duration },

    #[error("Business webhook returned HTTP {status}")]
    Http { status: u16 },

    #[error("Request failed: {0}")]
    Request(String),
}
