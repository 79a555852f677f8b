//! WebSocket session bookkeeping: handles, pool, heartbeat.

pub mod handle;
pub mod heartbeat;
pub mod pool;

pub use handle::{ConnectionHandle, ConnectionId};
pub use pool::ConnectionPool;
