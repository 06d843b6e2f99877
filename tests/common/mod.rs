//! Shared helpers for integration tests
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use voice_llm_bridge::{AppState, ServerConfig, routes};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const RETELL_KEY: &str = "key_integration_test";

/// Configuration pointing the LLM at `llm_base_url` and tools at `webhook_url`.
pub fn test_config(llm_base_url: &str, webhook_url: Option<String>) -> ServerConfig {
    let mut config = ServerConfig::new(RETELL_KEY, "sk-test", webhook_url);
    config.llm.base_url = llm_base_url.to_string();
    config.llm.stream_idle_timeout_secs = 5;
    config
}

/// Serve the full router on an ephemeral port.
pub async fn spawn_app(state: Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::create_app_router(state);
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// SSE body for a chat completion stream, terminated by `[DONE]`.
pub fn sse_body(chunks: &[Value]) -> String {
    let mut body: String = chunks.iter().map(|c| format!("data: {c}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn text_chunks(parts: &[&str]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| json!({"choices": [{"index": 0, "delta": {"content": part}}]}))
        .collect()
}

pub fn tool_call_chunks(id: &str, name: &str, fragments: &[&str]) -> Vec<Value> {
    let mut chunks = vec![json!({
        "choices": [{"index": 0, "delta": {"tool_calls": [{
            "index": 0,
            "id": id,
            "type": "function",
            "function": {"name": name, "arguments": ""}
        }]}}]
    })];
    chunks.extend(fragments.iter().map(|fragment| {
        json!({
            "choices": [{"index": 0, "delta": {"tool_calls": [{
                "index": 0,
                "function": {"arguments": fragment}
            }]}}]
        })
    }));
    chunks
}

pub fn sse_response(chunks: &[Value]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_body(chunks), "text/event-stream")
}

/// Answer every completion request with `chunks`.
pub async fn mount_completion(server: &MockServer, chunks: &[Value]) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(chunks))
        .mount(server)
        .await;
}

/// Answer the next completion request with `chunks`, once.
pub async fn mount_completion_once(server: &MockServer, chunks: &[Value]) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(chunks))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
}
