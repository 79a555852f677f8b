//! Append-only, capacity-bounded message log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use chathub_core::config::SyncConfig;
use chathub_core::types::{MessageId, UserIdentity};

use crate::error::SyncError;
use crate::message::validator::validate_content;

use super::message::Message;

/// Signals that a cursor points before the oldest retained message, so
/// some messages the caller never saw were evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictedCursorGap {
    /// The cursor the read started from.
    pub cursor: MessageId,
    /// Oldest message still in the log.
    pub oldest_retained: MessageId,
    /// How many messages between the two were evicted.
    pub missed: u64,
}

/// Result of [`MessageLog::since`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Since {
    /// Messages newer than the cursor, in log order.
    pub messages: Vec<Message>,
    /// Present when the cursor predates the retained window.
    pub gap: Option<EvictedCursorGap>,
}

impl Since {
    /// Id of the newest returned message, if any.
    pub fn last_id(&self) -> Option<MessageId> {
        self.messages.last().map(|m| m.id)
    }
}

#[derive(Debug)]
struct LogState {
    messages: VecDeque<Message>,
    next_id: MessageId,
    last_timestamp: Option<DateTime<Utc>>,
}

/// The single shared chat history.
///
/// All reads and writes go through one `RwLock`, so a reader never sees a
/// partially appended message and ids are assigned in lock order.
#[derive(Debug)]
pub struct MessageLog {
    state: RwLock<LogState>,
    capacity: usize,
    max_chars: usize,
}

impl MessageLog {
    /// Creates an empty log holding at most `capacity` messages.
    pub fn new(capacity: usize, max_chars: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: RwLock::new(LogState {
                messages: VecDeque::with_capacity(capacity),
                next_id: MessageId(1),
                last_timestamp: None,
            }),
            capacity,
            max_chars,
        }
    }

    /// Creates a log from the `[sync]` configuration section.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.history_capacity, config.max_message_chars)
    }

    /// Validates `content`, assigns the next id and timestamp, and stores
    /// the message at the tail, evicting from the head when full.
    pub fn append(&self, author: UserIdentity, content: &str) -> Result<Message, SyncError> {
        validate_content(content, self.max_chars)?;

        let mut state = self.state.write();

        let now = Utc::now();
        let timestamp = match state.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };

        let message = Message {
            id: state.next_id,
            author,
            content: content.to_string(),
            timestamp,
        };

        state.next_id = state.next_id.next();
        state.last_timestamp = Some(timestamp);
        state.messages.push_back(message.clone());

        while state.messages.len() > self.capacity {
            if let Some(evicted) = state.messages.pop_front() {
                trace!(message_id = %evicted.id, "Evicted message from history");
            }
        }

        debug!(
            message_id = %message.id,
            user_id = %message.author.id,
            "Message appended"
        );

        Ok(message)
    }

    /// Returns every message with an id strictly greater than `cursor`.
    ///
    /// When the cursor predates the oldest retained message, the whole
    /// retained window is returned together with an [`EvictedCursorGap`].
    pub fn since(&self, cursor: MessageId) -> Since {
        let state = self.state.read();

        let gap = state.messages.front().and_then(|oldest| {
            (oldest.id > cursor.next()).then(|| EvictedCursorGap {
                cursor,
                oldest_retained: oldest.id,
                missed: oldest.id.get() - cursor.get() - 1,
            })
        });

        let start = state.messages.partition_point(|m| m.id <= cursor);
        let messages = state.messages.range(start..).cloned().collect();

        Since { messages, gap }
    }

    /// Snapshot of the whole retained history, oldest first.
    pub fn all(&self) -> Vec<Message> {
        self.state.read().messages.iter().cloned().collect()
    }

    /// The most recent `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Message> {
        let state = self.state.read();
        let skip = state.messages.len().saturating_sub(n);
        state.messages.iter().skip(skip).cloned().collect()
    }

    /// Id of the newest message, or the sentinel when empty.
    pub fn latest_id(&self) -> MessageId {
        self.state
            .read()
            .messages
            .back()
            .map(|m| m.id)
            .unwrap_or(MessageId::BEGINNING)
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.state.read().messages.len()
    }

    /// Whether the log holds no messages.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
