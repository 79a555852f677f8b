//! Core type definitions used across the ChatHub workspace.

pub mod id;
pub mod identity;

pub use id::{MessageId, UserId};
pub use identity::{SessionContext, UserIdentity};
