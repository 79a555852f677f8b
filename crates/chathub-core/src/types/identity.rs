//! User identity and explicit per-request session context.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// A registered user as seen by the chat core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable numeric identifier.
    pub id: UserId,
    /// Display name, unique among registered users.
    pub name: String,
}

impl UserIdentity {
    /// Create an identity from its parts.
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Identity of the caller, resolved once at the boundary (HTTP token or
/// socket handshake) and passed explicitly into the sync core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// The authenticated user.
    pub user: UserIdentity,
}

impl SessionContext {
    /// Wrap a resolved identity.
    pub fn new(user: UserIdentity) -> Self {
        Self { user }
    }

    /// Shortcut for the caller's user id.
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Shortcut for the caller's display name.
    pub fn username(&self) -> &str {
        &self.user.name
    }
}
