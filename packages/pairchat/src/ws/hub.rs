//! Broadcast Hub
//!
//! Single entry point for sending a message: persist first, then announce
//! the stored message to every live connection. Delivery is best-effort;
//! the store stays the source of truth.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ChatError, Result};
use crate::metrics::ServerMetrics;
use crate::models::{Appended, Message, NewMessage};
use crate::repository::ChatRepository;

use super::protocol::ServerMessage;
use super::registry::{ConnectionRegistry, DeliveryFailure};

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

pub struct BroadcastHub {
    store: ChatRepository,
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<ServerMetrics>,
}

impl BroadcastHub {
    pub fn new(
        store: ChatRepository,
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            store,
            registry,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &ChatRepository {
        &self.store
    }

    /// Persist `new` and, only if that succeeded, broadcast it.
    ///
    /// A repeated client uuid returns the stored original without a second
    /// broadcast. Delivery problems never fail the call.
    pub async fn submit(&self, new: NewMessage) -> Result<Message> {
        self.submit_tracked(new).await.map(|a| a.message)
    }

    /// Like [`submit`](Self::submit), but also reports whether the message
    /// was already stored under the same client uuid.
    pub async fn submit_tracked(&self, new: NewMessage) -> Result<Appended> {
        if new.body.trim().is_empty() {
            return Err(ChatError::EmptyBody);
        }

        let appended = match self.store.append(&new).await {
            Ok(a) => a,
            Err(e @ ChatError::Conflict(_)) => {
                debug!(sender = %new.sender_id, "Rejected submission: {}", e);
                return Err(e);
            }
            Err(e) => {
                self.metrics.persistence_error();
                warn!(
                    sender = %new.sender_id,
                    receiver = %new.receiver_id,
                    "Failed to persist message: {}", e
                );
                return Err(e);
            }
        };

        if appended.duplicate {
            self.metrics.duplicate_submission();
            debug!(uuid = %appended.message.uuid, "Duplicate submission, not re-broadcasting");
            return Ok(appended);
        }

        self.metrics.message_submitted();
        let report = self
            .broadcast(ServerMessage::MessageReceived {
                message: appended.message.clone(),
            })
            .await;
        info!(
            id = appended.message.id,
            pair = %appended.message.pair_key(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Message stored and broadcast"
        );

        Ok(appended)
    }

    /// Offer `msg` to every connection in the current snapshot without
    /// waiting on any of them. Closed connections are pruned.
    pub async fn broadcast(&self, msg: ServerMessage) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for conn in self.registry.live_connections().await {
            match conn.try_deliver(msg.clone()) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryFailure::Full) => {
                    debug!(handle = %conn.handle, "Outbound queue full, dropping broadcast");
                    report.dropped += 1;
                }
                Err(DeliveryFailure::Closed) => {
                    debug!(handle = %conn.handle, "Connection gone, pruning");
                    self.registry.unregister(conn.handle).await;
                    report.dropped += 1;
                }
            }
        }

        self.metrics.broadcasts_delivered(report.delivered as u64);
        self.metrics.broadcasts_dropped(report.dropped as u64);
        report
    }
}
