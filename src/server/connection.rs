//! Per-subscriber connection task
//!
//! Performs the WebSocket handshake (rejecting any path other than the
//! stream's own), registers the subscriber, then forwards its queue to the
//! socket until either side closes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::WebSocketStream;

use crate::registry::{BroadcastPayload, CloseReason, ConnectionRegistry, Outbound, PayloadKind};

use super::identity::StreamIdentity;

fn reject(path: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(format!("Unknown stream {}", path)));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

fn close_frame(reason: CloseReason) -> CloseFrame {
    CloseFrame {
        code: CloseCode::from(reason.code()),
        reason: Utf8Bytes::from_static(reason.description()),
    }
}

fn to_message(payload: BroadcastPayload) -> Option<Message> {
    match payload.kind {
        PayloadKind::Binary => Some(Message::Binary(payload.data)),
        PayloadKind::Text => match Utf8Bytes::try_from(payload.data) {
            Ok(text) => Some(Message::Text(text)),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping non-UTF-8 text payload");
                None
            }
        },
    }
}

/// Per-connection limits taken from the server config
#[derive(Debug, Clone, Copy)]
pub(crate) struct SubscriberSettings {
    pub queue: usize,
    pub handshake_timeout: Duration,
}

/// Handle one inbound connection from handshake to close
pub(crate) async fn serve_subscriber(
    socket: TcpStream,
    peer_addr: SocketAddr,
    identity: StreamIdentity,
    registry: Arc<ConnectionRegistry>,
    settings: SubscriberSettings,
) {
    let callback = |request: &Request, response: Response| {
        let path = request.uri().path();
        if identity.matches_path(path) {
            Ok(response)
        } else {
            tracing::debug!(peer = %peer_addr, path = path, "Rejected subscription path");
            Err(reject(path))
        }
    };

    let handshake = tokio_tungstenite::accept_hdr_async(socket, callback);
    let mut ws = match tokio::time::timeout(settings.handshake_timeout, handshake).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            tracing::debug!(peer = %peer_addr, error = %e, "Handshake failed");
            return;
        }
        Err(_) => {
            tracing::debug!(peer = %peer_addr, "Handshake timed out");
            return;
        }
    };

    let Some((id, rx)) = registry.register(peer_addr, settings.queue) else {
        let _ = ws
            .send(Message::Close(Some(close_frame(CloseReason::GoingAway))))
            .await;
        return;
    };

    forward(ws, rx, peer_addr).await;
    registry.remove(id);
}

async fn forward(
    ws: WebSocketStream<TcpStream>,
    mut rx: mpsc::Receiver<Outbound>,
    peer_addr: SocketAddr,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            item = rx.recv() => {
                let message = match item {
                    Some(Outbound::Payload(payload)) => match to_message(payload) {
                        Some(message) => message,
                        None => continue,
                    },
                    Some(Outbound::Close(reason)) => {
                        let _ = sink.send(Message::Close(Some(close_frame(reason)))).await;
                        break;
                    }
                    // Registry dropped the handle without a close
                    None => {
                        let _ = sink
                            .send(Message::Close(Some(close_frame(CloseReason::GoingAway))))
                            .await;
                        break;
                    }
                };

                if let Err(e) = sink.send(message).await {
                    tracing::debug!(peer = %peer_addr, error = %e, "Send failed, closing");
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(peer = %peer_addr, error = %e, "Receive failed, closing");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_silent_peer_is_dropped_after_handshake_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let registry = Arc::new(ConnectionRegistry::new());

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (socket, peer) = listener.accept().await.unwrap();

        let settings = SubscriberSettings {
            queue: 4,
            handshake_timeout: Duration::from_millis(50),
        };
        let task = tokio::spawn(serve_subscriber(
            socket,
            peer,
            StreamIdentity::new("quiet").unwrap(),
            Arc::clone(&registry),
            settings,
        ));

        // Send nothing; the server must give up and close the socket
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("connection task outlived the handshake timeout")
            .unwrap();

        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));
        assert!(registry.is_empty());
    }
}
