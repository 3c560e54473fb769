use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;

use crate::hub::actor;
use crate::state::AppState;

/// Query parameters for the hub connection. The session token is optional:
/// anonymous readers connect without one and simply carry no claims.
#[derive(Debug, Deserialize)]
pub struct HubAuthQuery {
    pub token: Option<String>,
}

/// GET /notificationHub?token=SESSION
/// WebSocket upgrade endpoint for the notification hub.
/// A valid token attaches the session's role/account claims so the
/// connection auto-joins its role group; a missing or stale token is not an
/// error — the connection is accepted with no claims and the client may
/// still join groups explicitly.
pub async fn hub_upgrade(
    State(state): State<AppState>,
    Query(params): Query<HubAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let claims = params
        .token
        .as_deref()
        .and_then(|token| state.sessions.claims_for(token));

    match &claims {
        Some(claims) => tracing::info!(
            account_id = claims.account_id,
            role = claims.role,
            "Hub connection authenticated"
        ),
        None => tracing::debug!("Anonymous hub connection"),
    }

    ws.on_upgrade(move |socket| actor::run_connection(socket, state, claims))
}
