//! Values scoped to a single response turn.

use serde_json::Value;

use super::messages::Utterance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    ResponseRequired,
    ReminderRequired,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::ResponseRequired => "response_required",
            InteractionKind::ReminderRequired => "reminder_required",
        }
    }
}

/// A request for the agent to speak.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub response_id: u64,
    pub transcript: Vec<Utterance>,
    pub kind: InteractionKind,
}

/// A tool invocation being assembled from the completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    fragments: Vec<String>,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fragments: Vec::new(),
        }
    }

    pub fn push_fragment(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }

    /// The argument text received so far, in arrival order.
    pub fn arguments_text(&self) -> String {
        self.fragments.concat()
    }

    pub fn parse_arguments(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.arguments_text())
    }
}

/// A completed tool round, replayed to the model on the next round.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExchange {
    pub invocation_id: String,
    pub name: String,
    pub arguments: Value,
    pub result: String,
}

/// How a turn ended. Every variant corresponds to exactly one terminal reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model finished speaking.
    Completed,
    /// The model called `end_call`.
    EndedCall,
    /// The completion request or stream failed.
    UpstreamFailed,
    /// The model produced arguments that could not be decoded.
    ArgumentsRejected,
    /// The model kept calling tools past the round cap.
    RoundLimitExceeded,
    /// The connection closed before the turn could continue.
    Abandoned,
}
