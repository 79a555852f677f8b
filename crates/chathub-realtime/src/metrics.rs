//! Sync engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level counters.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    messages_posted: AtomicU64,
    messages_rejected: AtomicU64,
    events_delivered: AtomicU64,
    delivery_failures: AtomicU64,
    polls: AtomicU64,
    connections_opened: AtomicU64,
    connections_active: AtomicU64,
}

impl SyncMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// A message was appended to the log.
    pub fn message_posted(&self) {
        self.messages_posted.fetch_add(1, Ordering::Relaxed);
    }

    /// A post was rejected by validation.
    pub fn message_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one fan-out.
    pub fn fan_out(&self, delivered: u64, failed: u64) {
        self.events_delivered.fetch_add(delivered, Ordering::Relaxed);
        self.delivery_failures.fetch_add(failed, Ordering::Relaxed);
    }

    /// A poll was served.
    pub fn poll_served(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    /// A session connected.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// A session went away.
    pub fn connection_closed(&self) {
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_posted: self.messages_posted.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Messages appended to the log
    pub messages_posted: u64,
    /// Posts rejected by validation
    pub messages_rejected: u64,
    /// Events queued to sessions
    pub events_delivered: u64,
    /// Events dropped for closed or full sessions
    pub delivery_failures: u64,
    /// Polls served
    pub polls: u64,
    /// Sessions ever connected
    pub connections_opened: u64,
    /// Sessions currently connected
    pub connections_active: u64,
}
