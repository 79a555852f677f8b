//! Error taxonomy of the sync core.

use thiserror::Error;

use chathub_core::error::AppError;
use chathub_core::types::UserId;

/// Per-request failures raised by the message log, registries and façade.
///
/// None of these leave shared state partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Empty or over-length message content.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The referenced id, name or token is not registered.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// Registration under a name already owned by a different id.
    #[error("name '{name}' is already registered to user {owner}")]
    NameTaken {
        /// The contested name.
        name: String,
        /// Current owner of the name.
        owner: UserId,
    },

    /// Registration under an id already owned by a different name.
    #[error("user id {0} is already registered")]
    IdTaken(UserId),

    /// Every user id has been handed out.
    #[error("no user ids left to allocate")]
    IdsExhausted,
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::InvalidMessage(_) => AppError::validation(message),
            SyncError::UnknownUser(_) => AppError::unknown_user(message),
            SyncError::NameTaken { .. } | SyncError::IdTaken(_) => AppError::conflict(message),
            SyncError::IdsExhausted => AppError::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chathub_core::error::ErrorKind;

    #[test]
    fn test_maps_to_app_error_kinds() {
        let err: AppError = SyncError::InvalidMessage("empty".into()).into();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err: AppError = SyncError::UnknownUser("id 9".into()).into();
        assert_eq!(err.kind, ErrorKind::UnknownUser);
        assert_eq!(err.message, "unknown user: id 9");

        let err: AppError = SyncError::NameTaken {
            name: "bob".into(),
            owner: UserId(1),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err: AppError = SyncError::IdTaken(UserId(3)).into();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err: AppError = SyncError::IdsExhausted.into();
        assert_eq!(err.kind, ErrorKind::Internal);
    }
}
