//! LLM WebSocket message types
//!
//! The voice platform drives the conversation with `interaction_type`-tagged
//! JSON frames; the bridge answers with `response_type`-tagged frames.
//! Streamed text chunks and final replies share the wire type `response` and
//! differ only in `content_complete` / `end_call`.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Close code sent when the platform sends a binary frame.
pub const CLOSE_CODE_UNSUPPORTED_DATA: u16 = 1007;

/// Close reason sent with [`CLOSE_CODE_UNSUPPORTED_DATA`].
pub const BINARY_FRAME_CLOSE_REASON: &str = "Cannot process binary messages.";

// =============================================================================
// Incoming Messages (Platform -> Bridge)
// =============================================================================

/// Incoming WebSocket messages from the voice platform
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "interaction_type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Call metadata, sent once after the config handshake
    CallDetails {
        #[serde(default)]
        call: Value,
    },

    /// The caller finished speaking and a reply is expected
    ResponseRequired {
        response_id: u64,
        #[serde(default)]
        transcript: Vec<Utterance>,
    },

    /// The caller has been silent and the agent should nudge them
    ReminderRequired {
        response_id: u64,
        #[serde(default)]
        transcript: Vec<Utterance>,
    },

    /// Keep-alive; echoed back with the same timestamp
    PingPong { timestamp: u64 },

    /// Transcript update that needs no reply
    UpdateOnly {
        #[serde(default)]
        transcript: Vec<Utterance>,
    },

    /// Any interaction type this bridge does not handle
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The raw `interaction_type` of a frame, for logging frames that
    /// decoded as [`InboundMessage::Unknown`].
    pub fn interaction_type_of(text: &str) -> Option<String> {
        #[derive(Deserialize)]
        struct Envelope {
            interaction_type: Option<String>,
        }

        serde_json::from_str::<Envelope>(text)
            .ok()
            .and_then(|envelope| envelope.interaction_type)
    }
}

/// One line of the live transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Agent,
    #[serde(alias = "caller")]
    User,
    /// Any other speaker label; treated as the caller's side.
    #[serde(other)]
    Other,
}

// =============================================================================
// Outgoing Messages (Bridge -> Platform)
// =============================================================================

/// Outgoing WebSocket messages to the voice platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Handshake sent before anything else
    Config {
        auto_reconnect: bool,
        call_details: bool,
    },
    PingPong {
        timestamp: u64,
    },
    /// Streamed piece of a reply. `is_final` marks the end of the turn.
    TextChunk {
        response_id: u64,
        text: String,
        is_final: bool,
    },
    ToolCallAnnouncement {
        tool_call_id: String,
        name: String,
        /// Arguments re-serialised as a JSON string
        arguments: String,
    },
    ToolCallResult {
        tool_call_id: String,
        content: String,
    },
    /// Whole reply sent at once, optionally ending the call.
    FinalReply {
        response_id: u64,
        text: String,
        end_call: bool,
    },
}

impl OutboundMessage {
    pub fn config() -> Self {
        OutboundMessage::Config {
            auto_reconnect: true,
            call_details: true,
        }
    }

    pub fn text_chunk(response_id: u64, text: impl Into<String>, is_final: bool) -> Self {
        OutboundMessage::TextChunk {
            response_id,
            text: text.into(),
            is_final,
        }
    }

    pub fn final_reply(response_id: u64, text: impl Into<String>, end_call: bool) -> Self {
        OutboundMessage::FinalReply {
            response_id,
            text: text.into(),
            end_call,
        }
    }

    /// Whether this message ends a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OutboundMessage::TextChunk { is_final: true, .. } | OutboundMessage::FinalReply { .. }
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn wire(&self) -> WireMessage<'_> {
        match self {
            OutboundMessage::Config {
                auto_reconnect,
                call_details,
            } => WireMessage::Config {
                config: WireConfig {
                    auto_reconnect: *auto_reconnect,
                    call_details: *call_details,
                },
            },
            OutboundMessage::PingPong { timestamp } => WireMessage::PingPong {
                timestamp: *timestamp,
            },
            OutboundMessage::TextChunk {
                response_id,
                text,
                is_final,
            } => WireMessage::Response {
                response_id: *response_id,
                content: text,
                content_complete: *is_final,
                end_call: false,
            },
            OutboundMessage::ToolCallAnnouncement {
                tool_call_id,
                name,
                arguments,
            } => WireMessage::ToolCallInvocation {
                tool_call_id,
                name,
                arguments,
            },
            OutboundMessage::ToolCallResult {
                tool_call_id,
                content,
            } => WireMessage::ToolCallResult {
                tool_call_id,
                content,
            },
            OutboundMessage::FinalReply {
                response_id,
                text,
                end_call,
            } => WireMessage::Response {
                response_id: *response_id,
                content: text,
                content_complete: true,
                end_call: *end_call,
            },
        }
    }
}

impl Serialize for OutboundMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.wire().serialize(serializer)
    }
}

#[derive(Serialize)]
#[serde(tag = "response_type", rename_all = "snake_case")]
enum WireMessage<'a> {
    Config {
        config: WireConfig,
    },
    PingPong {
        timestamp: u64,
    },
    Response {
        response_id: u64,
        content: &'a str,
        content_complete: bool,
        end_call: bool,
    },
    ToolCallInvocation {
        tool_call_id: &'a str,
        name: &'a str,
        arguments: &'a str,
    },
    ToolCallResult {
        tool_call_id: &'a str,
        content: &'a str,
    },
}

#[derive(Serialize)]
struct WireConfig {
    auto_reconnect: bool,
    call_details: bool,
}

/// Message routing for the WebSocket sender task
#[derive(Debug)]
pub enum MessageRoute {
    /// JSON text message
    Outgoing(OutboundMessage),
    /// Close the connection with the given code
    Close { code: u16, reason: String },
}
