//! # chathub-realtime
//!
//! Real-time message synchronization and presence core for ChatHub:
//!
//! - Bounded, FIFO-evicting message log with "everything after cursor" reads
//! - Per-user monotonic cursors for incremental polling
//! - Presence registry indexed by id and by name
//! - Broadcast dispatcher fanning events out to live WebSocket sessions
//! - `SyncService` façade consumed by the HTTP and socket handlers

pub mod connection;
pub mod cursor;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod service;

pub use cursor::CursorRegistry;
pub use dispatcher::BroadcastDispatcher;
pub use error::SyncError;
pub use history::{EvictedCursorGap, Message, MessageLog, Since};
pub use presence::{Key, PresenceEntry, PresenceRegistry};
pub use service::{Poll, SyncService};
