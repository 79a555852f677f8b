//! Message log and cursor configuration.

use serde::{Deserialize, Serialize};

/// Settings for the bounded message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum number of messages retained; oldest are evicted first.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Maximum message length in Unicode code points.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Window size returned by the `get-messages` socket event.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            max_message_chars: default_max_message_chars(),
            recent_window: default_recent_window(),
        }
    }
}

fn default_history_capacity() -> usize {
    1000
}

fn default_max_message_chars() -> usize {
    2000
}

fn default_recent_window() -> usize {
    100
}
