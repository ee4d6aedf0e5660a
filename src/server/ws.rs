//! WebSocket fan-out of snapshot/update events
//!
//! Each connection gets its own broadcast receiver. Delivery is best-effort:
//! a client that falls behind the channel capacity loses the oldest events
//! and keeps receiving from wherever the stream is now.

use crate::aggregator::Aggregator;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

pub fn routes() -> Router<Arc<Aggregator>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(aggregator): State<Arc<Aggregator>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, aggregator))
}

async fn handle_socket(socket: WebSocket, aggregator: Arc<Aggregator>) {
    let mut events = aggregator.subscribe();
    let (mut sink, mut stream) = socket.split();
    tracing::debug!("WebSocket subscriber connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(text) = serde_json::to_string(&event) else { continue };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "WebSocket subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // inbound frames are ignored; this is a push-only stream
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("WebSocket subscriber disconnected");
}
