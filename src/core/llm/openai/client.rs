use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, error, trace};

use super::messages::{
    ChatCompletionChunk, ChatCompletionRequest, encode_message, encode_tool, extract_api_error,
};
use crate::config::LlmSettings;
use crate::core::llm::base::{
    ChatRequest, CompletionProvider, CompletionStream, LlmError, LlmResult, StreamEvent,
};

/// Longest error body kept from a failed completion request.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Streaming chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAICompletion {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    settings: LlmSettings,
}

impl OpenAICompletion {
    pub fn new(api_key: impl Into<String>, settings: LlmSettings) -> LlmResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::InvalidConfiguration(
                "API key is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| LlmError::InvalidConfiguration(e.to_string()))?;

        let endpoint = format!(
            "{}/chat/completions",
            settings.base_url.trim_end_matches('/')
        );

        Ok(Self {
            client,
            api_key,
            endpoint,
            settings,
        })
    }

    fn build_request(&self, request: &ChatRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: request.messages.iter().map(encode_message).collect(),
            tools: request.tools.iter().map(encode_tool).collect(),
            stream: true,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            frequency_penalty: self.settings.frequency_penalty,
            presence_penalty: self.settings.presence_penalty,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompletion {
    async fn stream_chat(&self, request: ChatRequest) -> LlmResult<CompletionStream> {
        let body = self.build_request(&request);
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "Requesting streamed completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            error!(status = status.as_u16(), "Completion request rejected");
            return Err(LlmError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(decode_event_stream(
            response,
            Duration::from_secs(self.settings.stream_idle_timeout_secs),
        ))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Turn a server-sent-events response into normalised completion events.
///
/// The stream ends after `[DONE]`, after the body closes, or after the first
/// error. A body that closes without `[DONE]` still yields `StreamEnd`.
fn decode_event_stream(response: reqwest::Response, idle_timeout: Duration) -> CompletionStream {
    Box::pin(async_stream::stream! {
        let mut events = Box::pin(response.bytes_stream().eventsource());

        loop {
            let event = match tokio::time::timeout(idle_timeout, events.next()).await {
                Ok(Some(Ok(event))) => event,
                Ok(Some(Err(e))) => {
                    yield Err(LlmError::StreamError(e.to_string()));
                    return;
                }
                Ok(None) => {
                    debug!("Completion stream closed without [DONE]");
                    yield Ok(StreamEvent::StreamEnd);
                    return;
                }
                Err(_) => {
                    yield Err(LlmError::StreamError(format!(
                        "no event within {}s",
                        idle_timeout.as_secs()
                    )));
                    return;
                }
            };

            let data = event.data.trim();
            trace!(data = %data, "Completion SSE event");
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                yield Ok(StreamEvent::StreamEnd);
                return;
            }

            let value: Value = match serde_json::from_str(data) {
                Ok(value) => value,
                Err(e) => {
                    yield Err(LlmError::StreamError(format!("undecodable chunk: {e}")));
                    return;
                }
            };

            if let Some(message) = extract_api_error(&value) {
                yield Err(LlmError::ProviderError(message));
                return;
            }

            let chunk: ChatCompletionChunk = match serde_json::from_value(value) {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(LlmError::StreamError(format!("unexpected chunk shape: {e}")));
                    return;
                }
            };

            for event in chunk.into_stream_events() {
                yield Ok(event);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::base::{ChatMessage, ToolDefinition};
    use serde_json::json;

    fn settings() -> LlmSettings {
        LlmSettings::default()
    }

    #[test]
    fn test_new_requires_api_key() {
        assert!(matches!(
            OpenAICompletion::new("", settings()),
            Err(LlmError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let mut s = settings();
        s.base_url = "http://localhost:9999/v1/".to_string();
        let client = OpenAICompletion::new("sk-test", s).unwrap();
        assert_eq!(client.endpoint, "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn test_build_request_carries_sampling_settings() {
        let client = OpenAICompletion::new("sk-test", settings()).unwrap();
        let request = ChatRequest {
            messages: vec![ChatMessage::System("be brief".into())],
            tools: vec![ToolDefinition {
                name: "end_call".into(),
                description: "hang up".into(),
                parameters: json!({"type": "object"}),
            }],
        };

        let body = serde_json::to_value(client.build_request(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4-turbo-preview");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 200);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!((body["frequency_penalty"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert!((body["presence_penalty"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["tools"][0]["function"]["name"], "end_call");
    }

    #[test]
    fn test_build_request_omits_empty_tools() {
        let client = OpenAICompletion::new("sk-test", settings()).unwrap();
        let body = serde_json::to_value(client.build_request(&ChatRequest::default())).unwrap();
        assert!(body.get("tools").is_none());
    }
}
