//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use chathub_core::config::AppConfig;
use chathub_realtime::SyncService;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Message log, cursors, presence and live sessions
    pub sync: Arc<SyncService>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state and the sync service it owns.
    pub fn new(config: AppConfig) -> Self {
        let sync = Arc::new(SyncService::new(&config.sync, &config.realtime));
        Self {
            config: Arc::new(config),
            sync,
            started_at: Instant::now(),
        }
    }
}
