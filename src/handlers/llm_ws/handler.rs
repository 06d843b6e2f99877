//! Call WebSocket handler
//!
//! One task per connection runs the receive loop below. Outbound frames go
//! through a dedicated sender task; turns are drafted by the call's turn
//! worker so `ping_pong` is never queued behind a completion.

use axum::{
    Extension,
    extract::{
        Path, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::middleware::ConnectionPermit;
use crate::state::AppState;

use super::messages::{
    BINARY_FRAME_CLOSE_REASON, CLOSE_CODE_UNSUPPORTED_DATA, MessageRoute, OutboundMessage,
};
use super::processor::{handle_text_frame, run_turn_worker};
use super::sink::ResponseSink;
use super::state::SessionContext;
use super::turn::CompletionRequest;

/// Outbound queue depth per connection
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Pending turns per connection
const TURN_QUEUE_SIZE: usize = 32;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (4 MB)
const MAX_WS_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Upper bound between idle checks
const MAX_IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Time allowed for queued frames to flush after the receive loop ends
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const CLOSE_CODE_NORMAL: u16 = 1000;

/// Call WebSocket handler
///
/// Upgrades `GET /llm-websocket/{call_id}`. When the connection-limit layer
/// is installed the request carries a [`ConnectionPermit`], held until the
/// socket task ends.
pub async fn llm_websocket_handler(
    ws: WebSocketUpgrade,
    Path(call_id): Path<String>,
    State(state): State<Arc<AppState>>,
    permit: Option<Extension<ConnectionPermit>>,
) -> Response {
    info!(call_id = %call_id, "Call WebSocket upgrade requested");
    let permit = permit.map(|Extension(permit)| permit);

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move {
            handle_call_socket(socket, call_id, state).await;
            drop(permit);
        })
}

/// Why the receive loop stopped
#[derive(Debug, Clone, Copy)]
enum CloseCause {
    ClientClosed,
    TransportError,
    BinaryFrame,
    IdleTimeout,
    Superseded,
    WorkerStopped,
}

async fn handle_call_socket(socket: WebSocket, call_id: String, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    state.register_call(&call_id, connection_id, cancel.clone());
    info!(call_id = %call_id, %connection_id, "Call WebSocket connection established");

    let (sender, mut receiver) = socket.split();
    let (route_tx, route_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);
    let mut sender_task = tokio::spawn(run_sender(sender, route_rx, cancel.clone()));
    let sink = ResponseSink::new(route_tx, cancel.clone());

    sink.send(OutboundMessage::config()).await;

    let (turn_tx, turn_rx) = mpsc::channel::<CompletionRequest>(TURN_QUEUE_SIZE);
    tokio::spawn(run_turn_worker(
        state.drafter_for(&call_id),
        turn_rx,
        sink.clone(),
    ));

    let mut session = SessionContext::new(call_id.clone(), connection_id);
    let idle_timeout = idle_timeout_for(state.config.ws_idle_timeout_secs, connection_id);
    let mut idle_check = tokio::time::interval(idle_check_interval(idle_timeout));
    idle_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    let cause = loop {
        select! {
            frame = receiver.next() => {
                last_activity = Instant::now();
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let keep_open = handle_text_frame(
                            text.as_str(),
                            &mut session,
                            &sink,
                            &turn_tx,
                            state.agent(),
                        )
                        .await;
                        if !keep_open {
                            break CloseCause::WorkerStopped;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!(call_id = %call_id, bytes = data.len(), "Binary frame received, closing");
                        sink.close(CLOSE_CODE_UNSUPPORTED_DATA, BINARY_FRAME_CLOSE_REASON).await;
                        break CloseCause::BinaryFrame;
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        debug!(call_id = %call_id, ?frame, "Close frame received");
                        break CloseCause::ClientClosed;
                    }
                    Some(Err(e)) => {
                        warn!(call_id = %call_id, error = %e, "Call WebSocket transport error");
                        break CloseCause::TransportError;
                    }
                    None => break CloseCause::ClientClosed,
                }
            }
            _ = cancel.cancelled() => {
                break CloseCause::Superseded;
            }
            _ = idle_check.tick() => {
                if last_activity.elapsed() > idle_timeout {
                    warn!(
                        call_id = %call_id,
                        idle_secs = last_activity.elapsed().as_secs(),
                        "Call WebSocket idle, closing stale connection"
                    );
                    sink.close(CLOSE_CODE_NORMAL, "idle timeout").await;
                    break CloseCause::IdleTimeout;
                }
            }
        }
    };

    // Stop accepting turns; an in-flight draft runs on but its output is discarded.
    drop(turn_tx);
    cancel.cancel();

    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, &mut sender_task)
        .await
        .is_err()
    {
        debug!(call_id = %call_id, "Sender task did not drain in time");
        sender_task.abort();
    }

    state.unregister_call(&call_id, connection_id);
    info!(
        call_id = %call_id,
        %connection_id,
        ?cause,
        turns = session.turns_requested,
        duration_ms = session.elapsed().as_millis() as u64,
        "Call WebSocket connection terminated"
    );
}

/// Forward queued routes to the socket until a close is requested or the
/// connection is cancelled. On cancellation, routes already queued are
/// still flushed.
async fn run_sender(
    mut sender: SplitSink<WebSocket, Message>,
    mut routes: mpsc::Receiver<MessageRoute>,
    cancel: CancellationToken,
) {
    loop {
        let route = select! {
            biased;
            route = routes.recv() => match route {
                Some(route) => route,
                None => break,
            },
            _ = cancel.cancelled() => {
                while let Ok(route) = routes.try_recv() {
                    if !forward(&mut sender, route).await {
                        return;
                    }
                }
                break;
            }
        };
        if !forward(&mut sender, route).await {
            return;
        }
    }
    let _ = sender.close().await;
}

/// Write one route. Returns false once the socket should no longer be used.
async fn forward(sender: &mut SplitSink<WebSocket, Message>, route: MessageRoute) -> bool {
    match route {
        MessageRoute::Outgoing(message) => {
            let json = match message.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Failed to serialize outbound message");
                    return true;
                }
            };
            match sender.send(Message::Text(json.into())).await {
                Ok(()) => true,
                Err(e) => {
                    debug!(error = %e, "Failed to send WebSocket message");
                    false
                }
            }
        }
        MessageRoute::Close { code, reason } => {
            let frame = CloseFrame {
                code,
                reason: reason.into(),
            };
            if let Err(e) = sender.send(Message::Close(Some(frame))).await {
                debug!(error = %e, "Failed to send close frame");
            }
            false
        }
    }
}

/// Idle timeout with ±10% jitter derived from the connection id, so
/// connections opened together do not all expire on the same tick.
fn idle_timeout_for(base_secs: u64, connection_id: Uuid) -> Duration {
    let base_secs = base_secs.max(1);
    let jitter_range = base_secs / 10;
    if jitter_range == 0 {
        return Duration::from_secs(base_secs);
    }
    let span = jitter_range * 2 + 1;
    let offset = (connection_id.as_u128() % span as u128) as u64;
    Duration::from_secs(base_secs - jitter_range + offset)
}

fn idle_check_interval(idle_timeout: Duration) -> Duration {
    (idle_timeout / 2).clamp(Duration::from_millis(100), MAX_IDLE_CHECK_INTERVAL)
}
