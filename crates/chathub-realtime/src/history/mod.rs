//! Bounded chat history.

pub mod log;
pub mod message;

pub use log::{EvictedCursorGap, MessageLog, Since};
pub use message::Message;
