//! Connection Registry
//!
//! Tracks every live WebSocket link. Connections carry no identity: the
//! registry answers "who is reachable", never "who is this".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use super::protocol::ServerMessage;

/// Default per-connection outbound queue depth.
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// Membership token for one live connection. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionHandle(u64);

impl ConnectionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What a new connection gets back from [`ConnectionRegistry::register`].
pub struct Registration {
    pub handle: ConnectionHandle,
    /// Direct replies to this connection (history, errors) go through here.
    pub sender: mpsc::Sender<ServerMessage>,
    /// Everything addressed to this connection, broadcasts included.
    pub receiver: mpsc::Receiver<ServerMessage>,
}

/// Why a single delivery did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// Outbound queue full: the client is not keeping up.
    Full,
    /// The connection is gone.
    Closed,
}

/// A connection as seen in a registry snapshot.
#[derive(Clone)]
pub struct LiveConnection {
    pub handle: ConnectionHandle,
    sender: mpsc::Sender<ServerMessage>,
}

impl LiveConnection {
    /// Queue `msg` without waiting.
    pub fn try_deliver(&self, msg: ServerMessage) -> Result<(), DeliveryFailure> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryFailure::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
    }
}

pub struct ConnectionRegistry {
    next_id: AtomicU64,
    buffer: usize,
    connections: RwLock<HashMap<ConnectionHandle, mpsc::Sender<ServerMessage>>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_BUFFER)
    }
}

impl ConnectionRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to the broadcast set.
    pub async fn register(&self) -> Registration {
        let handle = ConnectionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.connections
            .write()
            .await
            .insert(handle, sender.clone());
        debug!(%handle, "Registered connection");
        Registration {
            handle,
            sender,
            receiver,
        }
    }

    /// Remove a connection. Returns false if it was already gone.
    pub async fn unregister(&self, handle: ConnectionHandle) -> bool {
        let removed = self.connections.write().await.remove(&handle).is_some();
        if removed {
            debug!(%handle, "Unregistered connection");
        }
        removed
    }

    /// Consistent snapshot of the broadcast set, ordered by handle.
    pub async fn live_connections(&self) -> Vec<LiveConnection> {
        let guard = self.connections.read().await;
        let mut live: Vec<LiveConnection> = guard
            .iter()
            .map(|(handle, sender)| LiveConnection {
                handle: *handle,
                sender: sender.clone(),
            })
            .collect();
        live.sort_by_key(|c| c.handle);
        live
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
