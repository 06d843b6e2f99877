//! Streaming chat-completion providers.
//!
//! # Architecture
//!
//! - `CompletionProvider` trait for provider abstraction
//! - `StreamEvent` as the provider-neutral unit of streamed output
//! - `ChatMessage` / `ToolDefinition` as the provider-neutral prompt
//!
//! # Example
//!
//! ```rust,ignore
//! use voice_llm_bridge::config::LlmSettings;
//! use voice_llm_bridge::core::llm::{ChatMessage, ChatRequest, CompletionProvider, OpenAICompletion};
//! use futures::StreamExt;
//!
//! let provider = OpenAICompletion::new("sk-...", LlmSettings::default())?;
//! let mut stream = provider
//!     .stream_chat(ChatRequest {
//!         messages: vec![ChatMessage::User("Hola".into())],
//!         tools: vec![],
//!     })
//!     .await?;
//! while let Some(event) = stream.next().await {
//!     println!("{:?}", event?);
//! }
//! ```

pub mod base;
pub mod openai;

pub use base::{
    ChatMessage, ChatRequest, CompletionProvider, CompletionStream, LlmError, LlmResult,
    StreamEvent, ToolDefinition,
};
pub use openai::OpenAICompletion;
