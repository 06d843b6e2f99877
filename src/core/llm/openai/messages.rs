//! Wire types for the OpenAI chat-completions API.
//!
//! Only the subset used by streamed, tool-enabled completions is modelled.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::llm::base::{ChatMessage, StreamEvent, ToolDefinition};

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

/// Encode a prompt entry the way the chat-completions endpoint expects it.
pub fn encode_message(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::System(content) => json!({ "role": "system", "content": content }),
        ChatMessage::User(content) => json!({ "role": "user", "content": content }),
        ChatMessage::Assistant(content) => json!({ "role": "assistant", "content": content }),
        ChatMessage::AssistantToolCall {
            id,
            name,
            arguments,
        } => json!({
            "role": "assistant",
            "content": Value::Null,
            "tool_calls": [{
                "id": id,
                "type": "function",
                "function": {
                    "name": name,
                    // the API wants arguments as a JSON-encoded string
                    "arguments": arguments.to_string(),
                }
            }]
        }),
        ChatMessage::Tool {
            tool_call_id,
            content,
        } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": content,
        }),
    }
}

pub fn encode_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

// =============================================================================
// Streamed response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

impl ChatCompletionChunk {
    /// Map the first choice of this chunk onto normalised stream events.
    ///
    /// Only the first tool-call entry is considered. An entry with an id opens
    /// an invocation; an entry without one continues the open invocation.
    /// Text is reported only when the chunk carries no tool-call delta.
    pub fn into_stream_events(self) -> Vec<StreamEvent> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Vec::new();
        };
        let delta = choice.delta;

        if let Some(tool_call) = delta.tool_calls.and_then(|calls| calls.into_iter().next()) {
            let function = tool_call.function.unwrap_or_default();
            let fragment = function.arguments.filter(|args| !args.is_empty());

            let mut events = Vec::with_capacity(2);
            match tool_call.id.filter(|id| !id.is_empty()) {
                Some(id) => {
                    events.push(StreamEvent::ToolCallStart {
                        id,
                        name: function.name.unwrap_or_default(),
                    });
                    if let Some(fragment) = fragment {
                        events.push(StreamEvent::ToolCallArgumentFragment(fragment));
                    }
                }
                None => {
                    if let Some(fragment) = fragment {
                        events.push(StreamEvent::ToolCallArgumentFragment(fragment));
                    }
                }
            }
            return events;
        }

        match delta.content {
            Some(text) if !text.is_empty() => vec![StreamEvent::TextDelta(text)],
            _ => Vec::new(),
        }
    }
}

/// Pull a human-readable message out of an `{"error": ...}` stream event.
pub fn extract_api_error(event: &Value) -> Option<String> {
    let error = event.get("error")?;
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("An error occurred during streaming".to_string())
}
