//! WebSocket Protocol Types
//!
//! Message types for client-server communication over the chat WebSocket.

use serde::{Deserialize, Serialize};

use crate::models::{Message, NewMessage};

/// Messages sent FROM the client TO the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Submit a direct message; persisted, then broadcast to every connection.
    SendMessage {
        sender_id: String,
        receiver_id: String,
        body: String,
        /// Client-generated id so a retried send is stored once
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uuid: Option<String>,
    },

    /// Ask for the full history between two users (reply goes to this connection only)
    FetchHistory { user_a: String, user_b: String },

    Ping,
}

impl ClientMessage {
    /// Build the submission for a `SendMessage` frame.
    pub fn into_new_message(self) -> Option<NewMessage> {
        match self {
            ClientMessage::SendMessage {
                sender_id,
                receiver_id,
                body,
                uuid,
            } => Some(NewMessage {
                sender_id,
                receiver_id,
                body,
                sent_at: None,
                uuid,
            }),
            _ => None,
        }
    }
}

/// Messages sent FROM the server TO the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// First frame on every connection
    Connected { connection_id: u64 },

    /// A newly stored message. Sent to every live connection regardless of
    /// whether it is a party to the conversation; clients filter.
    MessageReceived { message: Message },

    /// Reply to `FetchHistory`
    History {
        user_a: String,
        user_b: String,
        messages: Vec<Message>,
    },

    Error { message: String },

    Pong,
}
