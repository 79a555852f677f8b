//! Login handler.

use axum::Json;
use axum::extract::State;
use tracing::info;

use crate::dto::request::LoginRequest;
use crate::dto::response::LoginResponse;
use crate::error::ApiError;
use crate::extractors::Payload;
use crate::state::AppState;

/// GET|POST /login: register or look up a user by name.
///
/// The returned token is the username itself.
pub async fn login(
    State(state): State<AppState>,
    Payload(req): Payload<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (identity, created) = state.sync.login(&req.username).map_err(ApiError::from)?;

    info!(
        user_id = %identity.id,
        username = %identity.name,
        created,
        "Login"
    );

    let message = if created { "user created!" } else { "user found!" };

    Ok(Json(LoginResponse {
        success: true,
        token: identity.name,
        user_id: identity.id,
        message: message.to_string(),
    }))
}
