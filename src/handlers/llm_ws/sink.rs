use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::messages::{MessageRoute, OutboundMessage};

/// Outbound side of one call connection.
///
/// Cloned into the turn worker. Once the connection closes the token is
/// cancelled and every later send is dropped silently.
#[derive(Clone)]
pub struct ResponseSink {
    tx: mpsc::Sender<MessageRoute>,
    cancel: CancellationToken,
}

impl ResponseSink {
    pub fn new(tx: mpsc::Sender<MessageRoute>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Queue `message` for the socket. Returns false if it was discarded.
    pub async fn send(&self, message: OutboundMessage) -> bool {
        if self.is_closed() {
            debug!(?message, "Connection closed, discarding outbound message");
            return false;
        }
        self.tx.send(MessageRoute::Outgoing(message)).await.is_ok()
    }

    /// Ask the sender task to close the socket.
    pub async fn close(&self, code: u16, reason: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        let _ = self
            .tx
            .send(MessageRoute::Close {
                code,
                reason: reason.into(),
            })
            .await;
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_delivers_until_cancelled() {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let sink = ResponseSink::new(tx, cancel.clone());

        assert!(sink.send(OutboundMessage::config()).await);
        assert!(matches!(
            rx.recv().await,
            Some(MessageRoute::Outgoing(OutboundMessage::Config { .. }))
        ));

        cancel.cancel();
        assert!(sink.is_closed());
        assert!(!sink.send(OutboundMessage::PingPong { timestamp: 1 }).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_is_discarded() {
        let (tx, rx) = mpsc::channel(8);
        let sink = ResponseSink::new(tx, CancellationToken::new());
        drop(rx);

        assert!(sink.is_closed());
        assert!(!sink.send(OutboundMessage::config()).await);
    }

    #[tokio::test]
    async fn test_close_queues_close_route() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ResponseSink::new(tx, CancellationToken::new());

        sink.close(1007, "binary").await;
        match rx.recv().await {
            Some(MessageRoute::Close { code, reason }) => {
                assert_eq!(code, 1007);
                assert_eq!(reason, "binary");
            }
            other => panic!("unexpected route: {other:?}"),
        }
    }
}
