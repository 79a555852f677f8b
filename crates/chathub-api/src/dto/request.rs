//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username; also the token the client sends back.
    #[validate(length(min = 1, max = 15, message = "Username must be 1 to 15 characters"))]
    pub username: String,
}

/// Chat post request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostMessageRequest {
    /// Token returned by login.
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    /// Message text. Emptiness and length are checked by the message log.
    pub message: String,
}

/// Chat poll request, as JSON body or query string.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PollRequest {
    /// Token returned by login.
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

/// WebSocket handshake query.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WsQuery {
    /// Token returned by login.
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}
