//! WebSocket Handler
//!
//! One task pair per chat connection: the sender drains the connection's
//! queue into the socket, the input loop decodes client frames.

use axum::extract::ws::{Message, WebSocket};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::history::HistoryService;
use crate::metrics::ServerMetrics;

use super::dispatch::{ConnectionContext, dispatch_text_frame};
use super::hub::BroadcastHub;
use super::protocol::ServerMessage;

/// Serve a chat connection until either side hangs up.
pub async fn handle_chat_ws(
    socket: WebSocket,
    hub: Arc<BroadcastHub>,
    history: HistoryService,
    metrics: Arc<ServerMetrics>,
) {
    let registration = hub.registry().register().await;
    let handle = registration.handle;
    let mut rx = registration.receiver;
    info!(%handle, "New chat WebSocket connection");
    metrics.connection_opened();

    let (mut ws_sender, mut ws_receiver) = socket.split();

    if registration
        .sender
        .send(ServerMessage::Connected {
            connection_id: handle.id(),
        })
        .await
        .is_err()
    {
        debug!(%handle, "Connection closed before greeting");
    }

    let sender_metrics = metrics.clone();
    let sender_task = async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                sender_metrics.websocket_error();
                break;
            }
        }
    };

    let ctx = ConnectionContext {
        handle,
        tx: registration.sender,
        hub: hub.clone(),
        history,
    };
    let input_metrics = metrics.clone();
    let input_task = async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => dispatch_text_frame(&ctx, text.as_str()).await,
                Ok(Message::Close(_)) => {
                    debug!(%handle, "Client closed connection");
                    break;
                }
                Err(e) => {
                    input_metrics.websocket_error();
                    error!(%handle, "WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = sender_task => debug!(%handle, "Sender task ended"),
        _ = input_task => debug!(%handle, "Input task ended"),
    }

    hub.registry().unregister(handle).await;
    metrics.connection_closed();
    info!(%handle, "Chat WebSocket connection closed");
}
