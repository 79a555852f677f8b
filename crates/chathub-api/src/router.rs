//! Route definitions for the ChatHub HTTP API.
//!
//! The chat routes sit at the root where polling clients expect them;
//! health checks are mounted under `/api`. The router receives `AppState`
//! and passes it to all handlers via Axum's `State` extractor.

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router with all routes and the request logging layer.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_handler));

    Router::new()
        .merge(chat_routes())
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Login, post, poll and presence endpoints
fn chat_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(handlers::auth::login).post(handlers::auth::login),
        )
        .route(
            "/chat",
            get(handlers::chat::poll_messages).post(handlers::chat::post_message),
        )
        .route("/chat/messages", get(handlers::chat::poll_messages))
        .route("/users", get(handlers::users::list_users))
}

/// Health check endpoints
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
