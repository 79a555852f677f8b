//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chathub_core::types::{MessageId, UserId};
use chathub_realtime::metrics::MetricsSnapshot;
use chathub_realtime::{EvictedCursorGap, Message, PresenceEntry};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// Token to send with later requests.
    pub token: String,
    /// Numeric user id.
    pub user_id: UserId,
    /// `"user created!"` or `"user found!"`.
    pub message: String,
}

/// A chat message as returned by the polling endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    /// Message id.
    pub id: MessageId,
    /// Creation time.
    pub time: DateTime<Utc>,
    /// Author's name.
    pub user: String,
    /// Message text.
    pub content: String,
}

impl From<Message> for ChatMessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            time: m.timestamp,
            user: m.author.name,
            content: m.content,
        }
    }
}

/// Poll response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    /// Messages not seen before, oldest first.
    pub messages: Vec<ChatMessageResponse>,
    /// Set when unseen messages were evicted before this poll.
    pub gap: Option<EvictedCursorGap>,
}

/// Presence of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    /// User ID.
    pub user_id: UserId,
    /// Username.
    pub username: String,
    /// Whether a live session is connected.
    pub online: bool,
    /// Last activity.
    pub last_activity: DateTime<Utc>,
}

impl From<PresenceEntry> for UserResponse {
    fn from(entry: PresenceEntry) -> Self {
        Self {
            user_id: entry.user_id,
            username: entry.name,
            online: entry.online,
            last_activity: entry.last_activity,
        }
    }
}

/// Presence listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    /// Users ordered by id.
    pub users: Vec<UserResponse>,
    /// How many of them are online.
    pub online: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status string.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// Overall status.
    pub status: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Registered users.
    pub registered_users: usize,
    /// Users with a live session.
    pub online_users: usize,
    /// Live WebSocket sessions.
    pub ws_connections: usize,
    /// Messages currently retained.
    pub history_len: usize,
    /// Configured history capacity.
    pub history_capacity: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}
