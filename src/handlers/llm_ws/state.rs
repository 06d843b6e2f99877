//! Per-call session bookkeeping
//!
//! Owned by the connection's receive loop. Nothing in here is shared with
//! other calls.

use serde_json::Value;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::messages::Utterance;
use super::turn::{CompletionRequest, InteractionKind};

#[derive(Debug)]
pub struct SessionContext {
    pub call_id: String,
    pub connection_id: Uuid,
    /// Metadata from `call_details`, if the platform sent it
    pub call: Option<Value>,
    /// Most recent transcript snapshot
    pub transcript: Vec<Utterance>,
    pub turns_requested: u64,
    pub last_response_id: Option<u64>,
    started_at: Instant,
}

impl SessionContext {
    pub fn new(call_id: impl Into<String>, connection_id: Uuid) -> Self {
        Self {
            call_id: call_id.into(),
            connection_id,
            call: None,
            transcript: Vec::new(),
            turns_requested: 0,
            last_response_id: None,
            started_at: Instant::now(),
        }
    }

    pub fn apply_call_details(&mut self, call: Value) {
        self.call = Some(call);
    }

    pub fn record_transcript(&mut self, transcript: Vec<Utterance>) {
        self.transcript = transcript;
    }

    /// Record a turn and build the request the turn worker will draft.
    pub fn begin_turn(
        &mut self,
        kind: InteractionKind,
        response_id: u64,
        transcript: Vec<Utterance>,
    ) -> CompletionRequest {
        self.turns_requested += 1;
        self.last_response_id = Some(response_id);
        self.transcript = transcript.clone();
        CompletionRequest {
            response_id,
            transcript,
            kind,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
