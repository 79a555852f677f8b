//! User presence tracking.

pub mod entry;
pub mod registry;

pub use entry::{Key, PresenceEntry};
pub use registry::PresenceRegistry;
