pub mod llm;
pub mod tools;

// Re-export commonly used types for convenience
pub use llm::{
    ChatMessage, ChatRequest, CompletionProvider, CompletionStream, LlmError, LlmResult,
    OpenAICompletion, StreamEvent, ToolDefinition,
};
pub use tools::{ToolCall, ToolDispatcher, ToolError, ToolName};
