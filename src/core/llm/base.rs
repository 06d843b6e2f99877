//! Base traits and types for streaming chat-completion providers.
//!
//! A provider turns a [`ChatRequest`] into a [`CompletionStream`] of
//! [`StreamEvent`]s. Events are already normalised: providers report text
//! deltas, the opening of a tool invocation, and argument fragments, and never
//! expose their own wire chunks to callers.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while requesting or consuming a completion.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request never reached the provider
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The provider answered with a non-success status
    #[error("Provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The provider reported an error inside the event stream
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// The event stream broke off or carried an undecodable chunk
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Invalid provider configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for completion operations.
pub type LlmResult<T> = Result<T, LlmError>;

// =============================================================================
// Prompt Types
// =============================================================================

/// A single entry of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant(String),
    /// An assistant turn that consisted only of a tool invocation.
    AssistantToolCall {
        id: String,
        name: String,
        arguments: Value,
    },
    /// The result of a previously requested tool invocation.
    Tool {
        tool_call_id: String,
        content: String,
    },
}

/// A tool the model may call, described by a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

// =============================================================================
// Stream Types
// =============================================================================

/// Normalised increments of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Spoken text to forward as-is.
    TextDelta(String),
    /// The model opened a tool invocation.
    ToolCallStart { id: String, name: String },
    /// More argument text for the currently open invocation.
    ToolCallArgumentFragment(String),
    /// The provider signalled the end of the completion.
    StreamEnd,
}

/// Boxed stream of completion events.
pub type CompletionStream = Pin<Box<dyn Stream<Item = LlmResult<StreamEvent>> + Send>>;

/// A chat-completion backend that streams its output.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streamed completion.
    ///
    /// Errors returned here mean no event was produced. Errors yielded by
    /// the stream mean the completion broke off part way.
    async fn stream_chat(&self, request: ChatRequest) -> LlmResult<CompletionStream>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}
