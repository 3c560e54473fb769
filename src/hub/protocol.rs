//! Client-invocable hub operations and their dispatch.
//!
//! Clients send JSON frames tagged by `"op"`; join-type operations are
//! acknowledged with the resolved group name so the caller can confirm it.
//! None of these operations check the caller's actual role — who may invoke
//! what is the page layer's responsibility (see DESIGN.md).

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::hub::router::NotificationHub;
use crate::hub::{ConnectionId, ConnectionSender};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all_fields = "camelCase")]
pub enum ClientRequest {
    RegisterUserRole { role: i32 },
    UnregisterUserRole { role: i32 },
    RegisterConnection { account_id: String },
    JoinArticleGroup { article_id: String },
    LeaveArticleGroup { article_id: String },
    JoinDashboardGroup,
    LeaveDashboardGroup,
}

/// Incoming frame: a request plus an optional correlation id.
#[derive(Debug, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default, rename = "requestId")]
    pub request_id: String,
    #[serde(flatten)]
    pub request: ClientRequest,
}

/// Acknowledgement for a completed operation. `group` is the resolved group
/// name for join-type operations, empty otherwise (and for unmapped roles).
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub group: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorReply {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub error: String,
}

/// Handle one incoming text frame: decode, apply the membership change,
/// acknowledge. A malformed frame gets an error reply, never a disconnect.
pub fn handle_text_message(
    text: &str,
    tx: &ConnectionSender,
    hub: &NotificationHub,
    conn: ConnectionId,
) {
    let envelope: ClientEnvelope = match serde_json::from_str(text) {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(connection = %conn, error = %e, "Failed to decode hub request");
            send_json(
                tx,
                &ErrorReply {
                    request_id: String::new(),
                    error: "Invalid hub request".to_string(),
                },
            );
            return;
        }
    };

    let group = dispatch(&envelope.request, hub, conn);
    tracing::debug!(connection = %conn, request = ?envelope.request, group = %group, "Hub request handled");

    if !envelope.request_id.is_empty() {
        send_json(
            tx,
            &Ack {
                request_id: envelope.request_id,
                group,
            },
        );
    }
}

/// Apply a membership operation and return the resolved group name
/// (empty for leave operations and unmapped role codes).
fn dispatch(request: &ClientRequest, hub: &NotificationHub, conn: ConnectionId) -> String {
    let groups = hub.groups();
    match request {
        ClientRequest::RegisterUserRole { role } => groups
            .join_role(conn, *role)
            .unwrap_or_default()
            .to_string(),
        ClientRequest::UnregisterUserRole { role } => {
            groups.leave_role(conn, *role);
            String::new()
        }
        ClientRequest::RegisterConnection { account_id } => {
            groups.join_account(conn, account_id)
        }
        ClientRequest::JoinArticleGroup { article_id } => {
            groups.join_article(conn, article_id);
            String::new()
        }
        ClientRequest::LeaveArticleGroup { article_id } => {
            groups.leave_article(conn, article_id);
            String::new()
        }
        ClientRequest::JoinDashboardGroup => {
            groups.join_dashboard(conn);
            String::new()
        }
        ClientRequest::LeaveDashboardGroup => {
            groups.leave_dashboard(conn);
            String::new()
        }
    }
}

fn send_json<T: Serialize>(tx: &ConnectionSender, value: &T) {
    if let Ok(payload) = serde_json::to_string(value) {
        let _ = tx.send(Message::Text(payload.into()));
    }
}
