//! Inbound and outbound WebSocket event definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chathub_core::types::{MessageId, UserId};

use crate::history::Message;
use crate::presence::PresenceEntry;

/// Events sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundEvent {
    /// Post a chat message.
    ChatMessage {
        /// Message text.
        text: String,
    },
    /// Request the most recent messages.
    GetMessages,
    /// Request the presence list.
    GetUserList,
    /// Pong response to server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: Option<i64>,
    },
}

/// A chat message as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    /// Message id.
    pub id: MessageId,
    /// Creation time.
    pub time: DateTime<Utc>,
    /// Author's display name.
    pub user: String,
    /// Message text.
    pub text: String,
}

impl From<&Message> for ChatLine {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            time: m.timestamp,
            user: m.author.name.clone(),
            text: m.content.clone(),
        }
    }
}

/// Events sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundEvent {
    /// Private acknowledgement for a newly connected session.
    Connected {
        /// The connected user's id.
        user_id: UserId,
        /// The connected user's name.
        user: String,
    },
    /// Another user came online.
    UserJoined {
        /// User ID.
        user_id: UserId,
        /// Username.
        user: String,
        /// Timestamp.
        time: DateTime<Utc>,
    },
    /// A user's last session went away.
    UserLeft {
        /// User ID.
        user_id: UserId,
        /// Username.
        user: String,
        /// Timestamp.
        time: DateTime<Utc>,
    },
    /// A newly posted message.
    ChatMessage(ChatLine),
    /// Reply to `get-messages`.
    Messages {
        /// Messages, oldest first.
        messages: Vec<ChatLine>,
    },
    /// Reply to `get-user-list`.
    UserList {
        /// Presence entries.
        users: Vec<PresenceEntry>,
    },
    /// Ping (server keepalive).
    Ping {
        /// Server timestamp in milliseconds.
        timestamp: i64,
    },
    /// Error message.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl OutboundEvent {
    /// Builds an error event from a code and message.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Short name of the event, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::UserJoined { .. } => "user-joined",
            Self::UserLeft { .. } => "user-left",
            Self::ChatMessage(_) => "chat-message",
            Self::Messages { .. } => "messages",
            Self::UserList { .. } => "user-list",
            Self::Ping { .. } => "ping",
            Self::Error { .. } => "error",
        }
    }
}
