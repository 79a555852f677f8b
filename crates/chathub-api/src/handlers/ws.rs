//! WebSocket upgrade handler.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use validator::Validate;

use chathub_core::types::SessionContext;
use chathub_realtime::Key;
use chathub_realtime::connection::heartbeat::run_heartbeat;

use crate::dto::request::WsQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws?token={username}: WebSocket upgrade
///
/// The token is resolved before upgrading, so unknown users get a plain
/// HTTP error instead of a socket.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let session = match authenticate(&state, &query) {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_ws_connection(state, session, socket)),
        Err(rejection) => rejection.into_response(),
    }
}

fn authenticate(state: &AppState, query: &WsQuery) -> Result<SessionContext, ApiError> {
    query.validate()?;
    state
        .sync
        .resolve(&Key::ByName(query.token.clone()))
        .map_err(ApiError::from)
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, session: SessionContext, socket: WebSocket) {
    let user_id = session.user_id();
    let (handle, mut outbound_rx) = match state.sync.connect(session) {
        Ok(pair) => pair,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "WebSocket session rejected");
            return;
        }
    };
    let conn_id = handle.id;

    info!(
        conn_id = %conn_id,
        user_id = %user_id,
        "WebSocket connection established"
    );

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Spawn outbound event forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!(conn_id = %conn_id, error = %e, "Failed to serialize event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut heartbeat = tokio::spawn(run_heartbeat(
        handle.clone(),
        state.sync.heartbeat_config(),
    ));

    // Process inbound frames until the client leaves or the heartbeat gives up
    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.sync.handle_inbound(&conn_id, text.as_str());
                }
                Some(Ok(Message::Pong(_))) => handle.record_pong(),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = &mut heartbeat => {
                info!(conn_id = %conn_id, "Session no longer alive");
                break;
            }
        }
    }

    // Cleanup
    heartbeat.abort();
    outbound_task.abort();
    state.sync.disconnect(&conn_id);

    info!(
        conn_id = %conn_id,
        user_id = %user_id,
        "WebSocket connection closed"
    );
}
