//! Presence entries and lookup keys.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chathub_core::types::{UserId, UserIdentity};

/// Presence state of one registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    /// User ID.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Whether at least one live session is connected.
    pub online: bool,
    /// Last connect, disconnect, post or poll.
    pub last_activity: DateTime<Utc>,
}

impl PresenceEntry {
    /// The identity this entry describes.
    pub fn identity(&self) -> UserIdentity {
        UserIdentity::new(self.user_id, self.name.clone())
    }
}

/// Lookup key for [`PresenceRegistry::lookup`](super::PresenceRegistry::lookup).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Look up by numeric id.
    ById(UserId),
    /// Look up by display name.
    ByName(String),
}

impl From<UserId> for Key {
    fn from(id: UserId) -> Self {
        Self::ById(id)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::ByName(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::ByName(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById(id) => write!(f, "id {id}"),
            Self::ByName(name) => write!(f, "name '{name}'"),
        }
    }
}
