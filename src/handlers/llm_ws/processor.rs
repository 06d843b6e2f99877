//! Inbound frame routing and the per-call turn worker.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;

use super::drafter::ResponseDrafter;
use super::messages::{InboundMessage, OutboundMessage};
use super::sink::ResponseSink;
use super::state::SessionContext;
use super::turn::{CompletionRequest, InteractionKind};

/// Process one inbound text frame
///
/// # Arguments
/// * `text` - Raw frame payload
/// * `session` - This call's session context
/// * `sink` - Outbound channel for immediate replies (greeting, ping)
/// * `turns` - Queue feeding the call's turn worker
/// * `agent` - Persona texts
///
/// # Returns
/// * `bool` - true to keep the connection open, false to close it
pub async fn handle_text_frame(
    text: &str,
    session: &mut SessionContext,
    sink: &ResponseSink,
    turns: &mpsc::Sender<CompletionRequest>,
    agent: &AgentConfig,
) -> bool {
    let message = match InboundMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(call_id = %session.call_id, error = %e, "Ignoring malformed frame");
            return true;
        }
    };

    match message {
        InboundMessage::CallDetails { call } => {
            debug!(call_id = %session.call_id, "Call details received");
            session.apply_call_details(call);
            sink.send(OutboundMessage::final_reply(
                0,
                agent.begin_message.clone(),
                false,
            ))
            .await;
            true
        }
        InboundMessage::ResponseRequired {
            response_id,
            transcript,
        } => {
            let request = session.begin_turn(InteractionKind::ResponseRequired, response_id, transcript);
            enqueue_turn(request, session, turns).await
        }
        InboundMessage::ReminderRequired {
            response_id,
            transcript,
        } => {
            let request = session.begin_turn(InteractionKind::ReminderRequired, response_id, transcript);
            enqueue_turn(request, session, turns).await
        }
        InboundMessage::PingPong { timestamp } => {
            sink.send(OutboundMessage::PingPong { timestamp }).await;
            true
        }
        InboundMessage::UpdateOnly { transcript } => {
            session.record_transcript(transcript);
            true
        }
        InboundMessage::Unknown => {
            warn!(
                call_id = %session.call_id,
                interaction_type = InboundMessage::interaction_type_of(text).as_deref().unwrap_or("<missing>"),
                "Unrecognized interaction type"
            );
            true
        }
    }
}

async fn enqueue_turn(
    request: CompletionRequest,
    session: &SessionContext,
    turns: &mpsc::Sender<CompletionRequest>,
) -> bool {
    debug!(
        call_id = %session.call_id,
        response_id = request.response_id,
        kind = request.kind.as_str(),
        "Turn requested"
    );
    if turns.send(request).await.is_err() {
        warn!(call_id = %session.call_id, "Turn worker has stopped, closing connection");
        return false;
    }
    true
}

/// Draft queued turns one at a time, in arrival order.
///
/// Runs until the queue is closed. Turns still queued once the connection
/// has closed are skipped.
pub async fn run_turn_worker(
    drafter: ResponseDrafter,
    mut turns: mpsc::Receiver<CompletionRequest>,
    sink: ResponseSink,
) {
    while let Some(request) = turns.recv().await {
        if sink.is_closed() {
            debug!(response_id = request.response_id, "Connection closed, skipping queued turn");
            continue;
        }
        let outcome = drafter.draft(&request, &sink).await;
        info!(response_id = request.response_id, ?outcome, "Turn finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::llm_ws::messages::{MessageRoute, Role};
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    struct Harness {
        session: SessionContext,
        sink: ResponseSink,
        outbound: mpsc::Receiver<MessageRoute>,
        turns_tx: mpsc::Sender<CompletionRequest>,
        turns_rx: mpsc::Receiver<CompletionRequest>,
        agent: AgentConfig,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, outbound) = mpsc::channel(16);
            let (turns_tx, turns_rx) = mpsc::channel(16);
            Self {
                session: SessionContext::new("call_1", Uuid::new_v4()),
                sink: ResponseSink::new(tx, CancellationToken::new()),
                outbound,
                turns_tx,
                turns_rx,
                agent: AgentConfig::default(),
            }
        }

        async fn frame(&mut self, value: serde_json::Value) -> bool {
            self.text(&value.to_string()).await
        }

        async fn text(&mut self, text: &str) -> bool {
            handle_text_frame(
                text,
                &mut self.session,
                &self.sink,
                &self.turns_tx,
                &self.agent,
            )
            .await
        }

        fn next_outbound(&mut self) -> Option<OutboundMessage> {
            match self.outbound.try_recv() {
                Ok(MessageRoute::Outgoing(message)) => Some(message),
                _ => None,
            }
        }
    }

    #[tokio::test]
    async fn test_call_details_sends_greeting() {
        let mut h = Harness::new();
        assert!(
            h.frame(json!({"interaction_type": "call_details", "call": {"call_id": "call_1"}}))
                .await
        );

        assert_eq!(
            h.next_outbound(),
            Some(OutboundMessage::final_reply(
                0,
                AgentConfig::default().begin_message,
                false
            ))
        );
        assert!(h.session.call.is_some());
    }

    #[tokio::test]
    async fn test_ping_pong_echoes_timestamp() {
        let mut h = Harness::new();
        assert!(
            h.frame(json!({"interaction_type": "ping_pong", "timestamp": 1703302407333u64}))
                .await
        );
        assert_eq!(
            h.next_outbound(),
            Some(OutboundMessage::PingPong {
                timestamp: 1703302407333
            })
        );
    }

    #[tokio::test]
    async fn test_response_and_reminder_are_queued_in_order() {
        let mut h = Harness::new();
        h.frame(json!({
            "interaction_type": "response_required",
            "response_id": 1,
            "transcript": [{"role": "user", "content": "Hola"}]
        }))
        .await;
        h.frame(json!({
            "interaction_type": "reminder_required",
            "response_id": 2,
            "transcript": []
        }))
        .await;

        let first = h.turns_rx.try_recv().unwrap();
        assert_eq!(first.response_id, 1);
        assert_eq!(first.kind, InteractionKind::ResponseRequired);
        assert_eq!(first.transcript[0].role, Role::User);

        let second = h.turns_rx.try_recv().unwrap();
        assert_eq!(second.response_id, 2);
        assert_eq!(second.kind, InteractionKind::ReminderRequired);

        assert_eq!(h.session.turns_requested, 2);
        assert!(h.next_outbound().is_none());
    }

    #[tokio::test]
    async fn test_update_only_records_transcript_silently() {
        let mut h = Harness::new();
        assert!(
            h.frame(json!({
                "interaction_type": "update_only",
                "transcript": [{"role": "agent", "content": "Hola"}]
            }))
            .await
        );
        assert_eq!(h.session.transcript.len(), 1);
        assert!(h.next_outbound().is_none());
        assert!(h.turns_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_frames_are_ignored() {
        let mut h = Harness::new();
        assert!(h.frame(json!({"interaction_type": "agent_interrupt"})).await);
        assert!(h.text("{not json").await);
        assert!(h.next_outbound().is_none());
        assert!(h.turns_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stopped_worker_closes_connection() {
        let mut h = Harness::new();
        h.turns_rx.close();
        assert!(
            !h.frame(json!({
                "interaction_type": "response_required",
                "response_id": 1,
                "transcript": []
            }))
            .await
        );
    }
}
