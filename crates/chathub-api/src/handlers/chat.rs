//! Polling chat handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::debug;

use chathub_core::types::SessionContext;
use chathub_realtime::Key;

use crate::dto::request::{PollRequest, PostMessageRequest};
use crate::dto::response::{ChatMessageResponse, PollResponse};
use crate::error::ApiError;
use crate::extractors::Payload;
use crate::state::AppState;

/// Resolves a login token to the caller's session.
fn session_for(state: &AppState, token: &str) -> Result<SessionContext, ApiError> {
    state
        .sync
        .resolve(&Key::ByName(token.to_string()))
        .map_err(ApiError::from)
}

/// POST /chat: append a message.
pub async fn post_message(
    State(state): State<AppState>,
    Payload(req): Payload<PostMessageRequest>,
) -> Result<StatusCode, ApiError> {
    let session = session_for(&state, &req.token)?;
    let message = state.sync.post(session.user_id(), &req.message)?;

    debug!(
        message_id = %message.id,
        user_id = %session.user_id(),
        "Message posted over HTTP"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// GET /chat: messages the caller has not seen yet.
pub async fn poll_messages(
    State(state): State<AppState>,
    Payload(req): Payload<PollRequest>,
) -> Result<Json<PollResponse>, ApiError> {
    let session = session_for(&state, &req.token)?;
    let poll = state.sync.poll(session.user_id())?;

    Ok(Json(PollResponse {
        messages: poll
            .messages
            .into_iter()
            .map(ChatMessageResponse::from)
            .collect(),
        gap: poll.gap,
    }))
}
