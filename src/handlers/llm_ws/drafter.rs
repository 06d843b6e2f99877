//! Streaming completion orchestration for one response turn.
//!
//! A turn is a bounded loop of completion rounds. Each round streams the
//! model's output: text is forwarded as it arrives, and at most one tool
//! invocation is assembled. If a tool was invoked it is executed, its result
//! is reported, and the next round replays the exchange so the model can
//! narrate the outcome. A business tool opened on the last round is not
//! executed. Every exit path sends exactly one terminal reply.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::core::llm::{ChatRequest, CompletionProvider, LlmResult, StreamEvent};
use crate::core::tools::{
    ToolCall, ToolDispatcher, ToolError, UNRECOGNIZED_TOOL_RESULT, declared_tools,
};

use super::messages::OutboundMessage;
use super::prompt::build_messages;
use super::sink::ResponseSink;
use super::turn::{CompletionRequest, ToolExchange, ToolInvocation, TurnOutcome};

/// Drafts replies for one call.
#[derive(Clone)]
pub struct ResponseDrafter {
    call_id: Arc<str>,
    provider: Arc<dyn CompletionProvider>,
    tools: Arc<ToolDispatcher>,
    agent: Arc<AgentConfig>,
    max_rounds: u32,
}

impl ResponseDrafter {
    pub fn new(
        call_id: impl Into<Arc<str>>,
        provider: Arc<dyn CompletionProvider>,
        tools: Arc<ToolDispatcher>,
        agent: Arc<AgentConfig>,
        max_rounds: u32,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            provider,
            tools,
            agent,
            max_rounds: max_rounds.max(1),
        }
    }

    /// Run one turn to its terminal reply.
    pub async fn draft(&self, request: &CompletionRequest, sink: &ResponseSink) -> TurnOutcome {
        let response_id = request.response_id;
        let mut prior: Option<ToolExchange> = None;

        for round in 1..=self.max_rounds {
            if round > 1 && sink.is_closed() {
                debug!(call_id = %self.call_id, response_id, round, "Connection closed, abandoning turn");
                return TurnOutcome::Abandoned;
            }

            let chat = ChatRequest {
                messages: build_messages(&self.agent, request, prior.as_ref()),
                tools: declared_tools(),
            };

            let invocation = match self.consume_round(response_id, chat, sink).await {
                Ok(Some(invocation)) => invocation,
                Ok(None) => {
                    sink.send(OutboundMessage::text_chunk(response_id, "", true))
                        .await;
                    return TurnOutcome::Completed;
                }
                Err(e) => {
                    error!(
                        call_id = %self.call_id,
                        response_id,
                        round,
                        provider = self.provider.name(),
                        error = %e,
                        "Completion stream failed"
                    );
                    sink.send(OutboundMessage::text_chunk(response_id, "", true))
                        .await;
                    return TurnOutcome::UpstreamFailed;
                }
            };

            let arguments = match invocation.parse_arguments() {
                Ok(arguments) => arguments,
                Err(e) => {
                    warn!(
                        call_id = %self.call_id,
                        response_id,
                        tool = %invocation.name,
                        error = %e,
                        "Tool arguments are not valid JSON"
                    );
                    return self.reject_arguments(response_id, sink).await;
                }
            };

            let call = match ToolCall::decode(&invocation.name, &arguments) {
                Ok(call) => Some(call),
                Err(ToolError::UnknownTool(name)) => {
                    warn!(call_id = %self.call_id, response_id, tool = %name, "Model called an undeclared tool");
                    None
                }
                Err(e) => {
                    warn!(
                        call_id = %self.call_id,
                        response_id,
                        error = %e,
                        "Tool arguments do not match the declared shape"
                    );
                    return self.reject_arguments(response_id, sink).await;
                }
            };

            if round == self.max_rounds && matches!(call, Some(ToolCall::Business(_))) {
                warn!(
                    call_id = %self.call_id,
                    response_id,
                    tool = %invocation.name,
                    max_rounds = self.max_rounds,
                    "Tool invoked on the last round, not dispatching"
                );
                return self.end_at_round_limit(response_id, sink).await;
            }

            info!(
                call_id = %self.call_id,
                response_id,
                round,
                tool = %invocation.name,
                tool_call_id = %invocation.id,
                "Tool invoked"
            );
            sink.send(OutboundMessage::ToolCallAnnouncement {
                tool_call_id: invocation.id.clone(),
                name: invocation.name.clone(),
                arguments: arguments.to_string(),
            })
            .await;

            let result = match call {
                Some(ToolCall::EndCall { message }) => {
                    sink.send(OutboundMessage::final_reply(response_id, message, true))
                        .await;
                    return TurnOutcome::EndedCall;
                }
                Some(ToolCall::Business(action)) => {
                    if sink.is_closed() {
                        debug!(call_id = %self.call_id, response_id, "Connection closed, skipping tool dispatch");
                        return TurnOutcome::Abandoned;
                    }
                    self.tools.execute(&action).await
                }
                None => UNRECOGNIZED_TOOL_RESULT.to_string(),
            };

            sink.send(OutboundMessage::ToolCallResult {
                tool_call_id: invocation.id.clone(),
                content: result.clone(),
            })
            .await;

            prior = Some(exchange(invocation, arguments, result));
        }

        warn!(
            call_id = %self.call_id,
            response_id,
            max_rounds = self.max_rounds,
            "Tool round limit reached"
        );
        self.end_at_round_limit(response_id, sink).await
    }

    /// Stream one completion, forwarding text and collecting the first tool invocation.
    async fn consume_round(
        &self,
        response_id: u64,
        chat: ChatRequest,
        sink: &ResponseSink,
    ) -> LlmResult<Option<ToolInvocation>> {
        let mut stream = self.provider.stream_chat(chat).await?;
        let mut invocation: Option<ToolInvocation> = None;

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta(text) => {
                    sink.send(OutboundMessage::text_chunk(response_id, text, false))
                        .await;
                }
                StreamEvent::ToolCallStart { id, name } => match &invocation {
                    Some(open) if open.id != id => {
                        debug!(
                            call_id = %self.call_id,
                            kept = %open.id,
                            ignored = %id,
                            "Second tool invocation in one stream, ignoring the rest"
                        );
                        break;
                    }
                    Some(_) => {}
                    None => invocation = Some(ToolInvocation::new(id, name)),
                },
                StreamEvent::ToolCallArgumentFragment(fragment) => match invocation.as_mut() {
                    Some(open) => open.push_fragment(fragment),
                    None => debug!("Argument fragment without an open invocation"),
                },
                StreamEvent::StreamEnd => break,
            }
        }

        Ok(invocation)
    }

    async fn end_at_round_limit(&self, response_id: u64, sink: &ResponseSink) -> TurnOutcome {
        sink.send(OutboundMessage::final_reply(
            response_id,
            self.agent.fallback_reply.clone(),
            false,
        ))
        .await;
        TurnOutcome::RoundLimitExceeded
    }

    async fn reject_arguments(&self, response_id: u64, sink: &ResponseSink) -> TurnOutcome {
        sink.send(OutboundMessage::final_reply(
            response_id,
            self.agent.fallback_reply.clone(),
            false,
        ))
        .await;
        TurnOutcome::ArgumentsRejected
    }
}

fn exchange(invocation: ToolInvocation, arguments: Value, result: String) -> ToolExchange {
    ToolExchange {
        invocation_id: invocation.id,
        name: invocation.name,
        arguments,
        result,
    }
}
