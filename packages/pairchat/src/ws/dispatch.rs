//! Per-frame dispatch for the chat WebSocket.
//!
//! Kept apart from the socket loop so it can be driven with a plain channel
//! in tests.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::history::HistoryService;

use super::hub::BroadcastHub;
use super::protocol::{ClientMessage, ServerMessage};
use super::registry::ConnectionHandle;

/// Per-connection context shared between the socket loop and the dispatcher.
pub(crate) struct ConnectionContext {
    pub handle: ConnectionHandle,
    /// Replies meant for this connection only
    pub tx: mpsc::Sender<ServerMessage>,
    pub hub: Arc<BroadcastHub>,
    pub history: HistoryService,
}

impl ConnectionContext {
    async fn reply(&self, msg: ServerMessage) {
        if self.tx.send(msg).await.is_err() {
            debug!(handle = %self.handle, "Reply dropped, connection closing");
        }
    }

    async fn reply_error(&self, message: impl Into<String>) {
        self.reply(ServerMessage::Error {
            message: message.into(),
        })
        .await;
    }
}

/// Handle one decoded client frame.
///
/// Sends are awaited in place so one connection's submissions reach the
/// store in the order they arrived.
pub(crate) async fn dispatch_client_message(ctx: &ConnectionContext, msg: ClientMessage) {
    match msg {
        ClientMessage::SendMessage { .. } => {
            let Some(new) = msg.into_new_message() else {
                return;
            };
            match ctx.hub.submit(new).await {
                // The sender sees its own message through the broadcast.
                Ok(_) => {}
                Err(e @ ChatError::EmptyBody) => ctx.reply_error(e.to_string()).await,
                Err(e) => {
                    warn!(handle = %ctx.handle, "Send failed: {}", e);
                    ctx.reply_error(e.to_string()).await;
                }
            }
        }
        ClientMessage::FetchHistory { user_a, user_b } => {
            match ctx.history.open_conversation(&user_a, &user_b).await {
                Ok(messages) => {
                    ctx.reply(ServerMessage::History {
                        user_a,
                        user_b,
                        messages,
                    })
                    .await
                }
                Err(e) => {
                    warn!(handle = %ctx.handle, "History fetch failed: {}", e);
                    ctx.reply_error(e.to_string()).await;
                }
            }
        }
        ClientMessage::Ping => ctx.reply(ServerMessage::Pong).await,
    }
}

/// Decode a text frame and dispatch it; malformed frames get an `Error` reply.
pub(crate) async fn dispatch_text_frame(ctx: &ConnectionContext, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => dispatch_client_message(ctx, msg).await,
        Err(e) => {
            debug!(handle = %ctx.handle, "Ignoring invalid frame: {}", e);
            ctx.reply_error(format!("invalid message: {}", e)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ServerMetrics;
    use crate::repository::test_helpers;
    use crate::ws::ConnectionRegistry;

    async fn make_test_ctx() -> (ConnectionContext, mpsc::Receiver<ServerMessage>) {
        let repo = test_helpers::test_repository().await;
        let hub = Arc::new(BroadcastHub::new(
            repo.clone(),
            Arc::new(ConnectionRegistry::default()),
            Arc::new(ServerMetrics::new()),
        ));
        let reg = hub.registry().register().await;
        let ctx = ConnectionContext {
            handle: reg.handle,
            tx: reg.sender,
            hub,
            history: HistoryService::new(repo),
        };
        (ctx, reg.receiver)
    }

    #[tokio::test]
    async fn send_message_comes_back_as_broadcast() {
        let (ctx, mut rx) = make_test_ctx().await;
        dispatch_client_message(
            &ctx,
            ClientMessage::SendMessage {
                sender_id: "u1".into(),
                receiver_id: "u2".into(),
                body: "hello".into(),
                uuid: None,
            },
        )
        .await;

        match rx.try_recv().unwrap() {
            ServerMessage::MessageReceived { message } => {
                assert_eq!(message.sender_id, "u1");
                assert_eq!(message.body, "hello");
            }
            other => panic!("Expected MessageReceived, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_body_gets_error_reply() {
        let (ctx, mut rx) = make_test_ctx().await;
        dispatch_client_message(
            &ctx,
            ClientMessage::SendMessage {
                sender_id: "u1".into(),
                receiver_id: "u2".into(),
                body: "  ".into(),
                uuid: None,
            },
        )
        .await;

        match rx.try_recv().unwrap() {
            ServerMessage::Error { message } => assert!(message.contains("empty")),
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fetch_history_replies_to_requester() {
        let (ctx, mut rx) = make_test_ctx().await;
        ctx.hub
            .store()
            .append(&crate::models::NewMessage::new("b", "a", "earlier"))
            .await
            .unwrap();

        dispatch_client_message(
            &ctx,
            ClientMessage::FetchHistory {
                user_a: "a".into(),
                user_b: "b".into(),
            },
        )
        .await;

        match rx.try_recv().unwrap() {
            ServerMessage::History {
                user_a, messages, ..
            } => {
                assert_eq!(user_a, "a");
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].body, "earlier");
            }
            other => panic!("Expected History, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn ping_and_garbage() {
        let (ctx, mut rx) = make_test_ctx().await;
        dispatch_text_frame(&ctx, r#"{"type":"Ping"}"#).await;
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Pong));

        dispatch_text_frame(&ctx, "not json").await;
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServerMessage::Error { .. }
        ));
    }
}
