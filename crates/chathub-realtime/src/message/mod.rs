//! WebSocket event types and validation.

pub mod types;
pub mod validator;

pub use types::{ChatLine, InboundEvent, OutboundEvent};
