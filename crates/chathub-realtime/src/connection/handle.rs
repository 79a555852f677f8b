//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use chathub_core::types::{SessionContext, UserId};

use crate::message::types::OutboundEvent;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single live session.
///
/// Holds the sender half of the session's outbound queue plus the
/// identity it was opened with.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Who opened the session
    pub session: SessionContext,
    /// Sender for outbound events
    sender: mpsc::Sender<OutboundEvent>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last pong received
    last_pong: Mutex<DateTime<Utc>>,
    /// Whether the connection is still alive
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(session: SessionContext, sender: mpsc::Sender<OutboundEvent>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session,
            sender,
            connected_at: now,
            last_pong: Mutex::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// User this connection belongs to
    pub fn user_id(&self) -> UserId {
        self.session.user_id()
    }

    /// Queue an event for this connection without waiting.
    ///
    /// Returns `false` when the event was dropped: the connection is dead,
    /// its receiver is gone, or its buffer is full.
    pub fn send(&self, event: OutboundEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Record a pong response
    pub fn record_pong(&self) {
        *self.last_pong.lock() = Utc::now();
    }

    /// Time of the last pong (or of the connect, if none yet)
    pub fn last_pong(&self) -> DateTime<Utc> {
        *self.last_pong.lock()
    }

    #[cfg(test)]
    pub(crate) fn set_last_pong(&self, at: DateTime<Utc>) {
        *self.last_pong.lock() = at;
    }
}
