//! OpenAI chat-completions provider.
//!
//! Streams `POST {base_url}/chat/completions` with `stream: true` and maps the
//! server-sent chunks onto [`StreamEvent`](crate::core::llm::StreamEvent)s.

mod client;
pub mod messages;

pub use client::OpenAICompletion;
