//! WebSocket handler
//!
//! One reader task feeds inbound frames to the gateway; one writer task drains
//! the connection's outbound queue into the socket. Whichever ends first tears
//! the other down, then the connection is unregistered.

use crate::connection::Connection;
use crate::protocol::ServerEnvelope;
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// WebSocket upgrade handler
pub async fn ws_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let gateway = state.gateway().clone();

    let (connection, rx) = match gateway.connect() {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to register connection");
            return;
        }
    };
    let connection_id = connection.id().to_string();

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (ws_sink, mut ws_stream) = socket.split();

    let recv_gateway = gateway.clone();
    let recv_id = connection_id.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let outcome = recv_gateway.on_message(&recv_id, &text);
                    tracing::trace!(connection_id = %recv_id, outcome = %outcome, "Frame handled");
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(connection_id = %recv_id, "Binary frame ignored");
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong is handled automatically by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(connection_id = %recv_id, "Client closed connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %recv_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    let mut send_task = tokio::spawn(write_loop(connection.clone(), rx, ws_sink));

    tokio::select! {
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task ended");
            send_task.abort();
        }
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task ended");
            recv_task.abort();
        }
    }

    gateway.on_disconnect(&connection_id);
}

/// Drain the outbound queue into the socket until the connection closes
async fn write_loop(
    connection: Arc<Connection>,
    mut rx: mpsc::Receiver<ServerEnvelope>,
    mut ws_sink: SplitSink<WebSocket, Message>,
) {
    loop {
        tokio::select! {
            biased;

            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };

                let json = match envelope.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(connection_id = %connection.id(), error = %e, "Failed to encode envelope");
                        continue;
                    }
                };

                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    tracing::warn!(
                        connection_id = %connection.id(),
                        "Failed to send message to WebSocket"
                    );
                    break;
                }
            }
            () = connection.closed() => {
                if connection.overflowed() {
                    tracing::warn!(connection_id = %connection.id(), "Dropping slow client");
                }
                break;
            }
        }
    }

    let _ = ws_sink.close().await;
}
