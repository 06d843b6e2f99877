//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check and service index
//! - `webhook` - Signed call lifecycle notifications
//! - `llm_ws` - The voice platform's call WebSocket

pub mod api;
pub mod llm_ws;
pub mod webhook;

pub use llm_ws::llm_websocket_handler;
pub use webhook::lifecycle_webhook;
