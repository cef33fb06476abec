//! Gateway engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Total frames sent to clients.
    pub messages_sent: AtomicU64,
    /// Total events received from clients.
    pub messages_received: AtomicU64,
    /// Total connections ever established.
    pub connections_total: AtomicU64,
    /// Connections currently active.
    pub connections_active: AtomicU64,
    /// Total calls initiated.
    pub calls_initiated: AtomicU64,
    /// Total push notifications attempted.
    pub push_attempts: AtomicU64,
    /// Total push notification failures.
    pub push_failures: AtomicU64,
    /// Total inbound events rejected with an error event.
    pub events_rejected: AtomicU64,
}

impl GatewayMetrics {
    /// Creates new zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an opened connection.
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a closed connection.
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Records an inbound event.
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` delivered frames.
    pub fn messages_sent(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Records an initiated call.
    pub fn call_initiated(&self) {
        self.calls_initiated.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a push attempt.
    pub fn push_attempted(&self) {
        self.push_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a push failure.
    pub fn push_failed(&self) {
        self.push_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a rejected inbound event.
    pub fn event_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            calls_initiated: self.calls_initiated.load(Ordering::Relaxed),
            push_attempts: self.push_attempts.load(Ordering::Relaxed),
            push_failures: self.push_failures.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total frames sent.
    pub messages_sent: u64,
    /// Total events received.
    pub messages_received: u64,
    /// Total connections ever established.
    pub connections_total: u64,
    /// Currently active connections.
    pub connections_active: u64,
    /// Total calls initiated.
    pub calls_initiated: u64,
    /// Total push notifications attempted.
    pub push_attempts: u64,
    /// Total push notification failures.
    pub push_failures: u64,
    /// Total inbound events rejected.
    pub events_rejected: u64,
}
