//! Voice platform call WebSocket
//!
//! Speaks the platform's turn protocol on `/llm-websocket/{call_id}`.
//!
//! # Protocol
//!
//! Inbound frames are JSON text tagged by `interaction_type`:
//!
//! | `interaction_type`  | Handling                                             |
//! |---------------------|------------------------------------------------------|
//! | `call_details`      | record call metadata, send the greeting (`response_id` 0) |
//! | `response_required` | queue a turn                                         |
//! | `reminder_required` | queue a turn with the reminder nudge                 |
//! | `ping_pong`         | echo the timestamp immediately                       |
//! | `update_only`       | record the transcript, no reply                      |
//! | anything else       | logged and ignored                                   |
//!
//! Outbound frames are tagged by `response_type`: `config` (always first),
//! `ping_pong`, `response`, `tool_call_invocation` and `tool_call_result`.
//!
//! Binary frames close the connection with code 1007.
//!
//! # Turns
//!
//! Turns for one call are drafted strictly in arrival order by a single
//! worker task. Each turn streams text chunks as they arrive and ends with
//! exactly one terminal `response` frame (`content_complete: true`).

mod drafter;
mod handler;
mod messages;
mod processor;
mod prompt;
mod sink;
mod state;
mod turn;

pub use drafter::ResponseDrafter;
pub use handler::llm_websocket_handler;
pub use messages::{
    BINARY_FRAME_CLOSE_REASON, CLOSE_CODE_UNSUPPORTED_DATA, InboundMessage, MessageRoute,
    OutboundMessage, Role, Utterance,
};
pub use prompt::build_messages;
pub use sink::ResponseSink;
pub use state::SessionContext;
pub use turn::{CompletionRequest, InteractionKind, ToolExchange, ToolInvocation, TurnOutcome};
