//! Stored chat message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chathub_core::types::{MessageId, UserIdentity};

/// A message as retained by the [`MessageLog`](super::MessageLog).
///
/// Built only by the log on append; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Log-assigned id, strictly increasing in append order.
    pub id: MessageId,
    /// Who posted it.
    pub author: UserIdentity,
    /// Validated message text.
    pub content: String,
    /// Creation time, non-decreasing in append order.
    pub timestamp: DateTime<Utc>,
}
