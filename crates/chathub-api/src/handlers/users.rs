//! Presence listing handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{UserListResponse, UserResponse};
use crate::state::AppState;

/// GET /users: every registered user with presence.
pub async fn list_users(State(state): State<AppState>) -> Json<UserListResponse> {
    let users: Vec<UserResponse> = state
        .sync
        .users()
        .into_iter()
        .map(UserResponse::from)
        .collect();
    let online = users.iter().filter(|u| u.online).count();

    Json(UserListResponse { users, online })
}
