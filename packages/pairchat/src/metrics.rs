//! Server metrics for observability
//!
//! Provides runtime metrics for monitoring server health and delivery.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server-wide metrics
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    /// Currently active WebSocket connections
    pub active_connections: AtomicU64,
    /// Total connections since server start
    pub total_connections: AtomicU64,

    // Message metrics
    /// Messages durably stored through the hub
    pub messages_submitted: AtomicU64,
    /// Submissions collapsed onto an already-stored uuid
    pub duplicate_submissions: AtomicU64,
    /// Individual broadcast deliveries queued to a connection
    pub broadcasts_delivered: AtomicU64,
    /// Individual broadcast deliveries skipped (slow or closed connection)
    pub broadcasts_dropped: AtomicU64,

    // Error metrics
    /// Failed writes to the message store
    pub persistence_errors: AtomicU64,
    /// WebSocket errors
    pub websocket_errors: AtomicU64,

    /// Server start time (for uptime calculation)
    start_time: Option<Instant>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    // Connection tracking
    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    // Message tracking
    pub fn message_submitted(&self) {
        self.messages_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplicate_submission(&self) {
        self.duplicate_submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn broadcasts_delivered(&self, n: u64) {
        self.broadcasts_delivered.fetch_add(n, Ordering::Relaxed);
    }

    pub fn broadcasts_dropped(&self, n: u64) {
        self.broadcasts_dropped.fetch_add(n, Ordering::Relaxed);
    }

    // Error tracking
    pub fn persistence_error(&self) {
        self.persistence_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn websocket_error(&self) {
        self.websocket_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    /// Create a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            connections: ConnectionMetrics {
                active: self.active_connections.load(Ordering::Relaxed),
                total: self.total_connections.load(Ordering::Relaxed),
            },
            messages: MessageMetrics {
                submitted: self.messages_submitted.load(Ordering::Relaxed),
                duplicates: self.duplicate_submissions.load(Ordering::Relaxed),
                broadcasts_delivered: self.broadcasts_delivered.load(Ordering::Relaxed),
                broadcasts_dropped: self.broadcasts_dropped.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                persistence: self.persistence_errors.load(Ordering::Relaxed),
                websocket: self.websocket_errors.load(Ordering::Relaxed),
            },
        }
    }
}

/// Serializable snapshot of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections: ConnectionMetrics,
    pub messages: MessageMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    pub active: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetrics {
    pub submitted: u64,
    pub duplicates: u64,
    pub broadcasts_delivered: u64,
    pub broadcasts_dropped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub persistence: u64,
    pub websocket: u64,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub connections: u64,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_tracking() {
        let metrics = ServerMetrics::new();

        metrics.connection_opened();
        metrics.connection_opened();
        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.total_connections.load(Ordering::Relaxed), 2);

        metrics.connection_closed();
        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_connections.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_broadcast_tracking() {
        let metrics = ServerMetrics::new();
        metrics.broadcasts_delivered(3);
        metrics.broadcasts_delivered(2);
        metrics.broadcasts_dropped(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages.broadcasts_delivered, 5);
        assert_eq!(snapshot.messages.broadcasts_dropped, 1);
    }

    #[test]
    fn test_snapshot() {
        let metrics = ServerMetrics::new();
        metrics.connection_opened();
        metrics.message_submitted();
        metrics.duplicate_submission();
        metrics.persistence_error();
        metrics.websocket_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections.active, 1);
        assert_eq!(snapshot.messages.submitted, 1);
        assert_eq!(snapshot.messages.duplicates, 1);
        assert_eq!(snapshot.errors.persistence, 1);
        assert_eq!(snapshot.errors.websocket, 1);
    }

    #[test]
    fn test_persistence_errors_reported_once() {
        let metrics = ServerMetrics::new();
        metrics.persistence_error();

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["errors"]["persistence"], 1);
        assert!(json["messages"].get("persistence_errors").is_none());
    }
}
