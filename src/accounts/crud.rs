//! Account management endpoints (admin-gated) and their hub triggers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::login::hash_password;
use crate::auth::middleware::{require_admin, Claims};
use crate::db::models::Account;
use crate::hub::events::{DashboardEntityType, DashboardEventType};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: String,
    pub role: i32,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    pub password: Option<String>,
}

/// GET /api/accounts — List all accounts (admin only).
pub async fn list_accounts(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<Account>>, (StatusCode, String)> {
    require_admin(&claims)?;

    let db = state.db.clone();
    let accounts = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        let mut stmt = conn
            .prepare("SELECT id, name, email, role, is_active FROM system_accounts ORDER BY id")
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Prepare".to_string()))?;
        let accounts: Vec<Account> = stmt
            .query_map([], |row| {
                Ok(Account {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    role: row.get(3)?,
                    is_active: row.get(4)?,
                })
            })
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Query".to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok::<_, (StatusCode, String)>(accounts)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(accounts))
}

/// GET /api/accounts/me — The caller's own profile.
pub async fn my_profile(claims: Claims) -> Json<Account> {
    Json(Account {
        id: claims.account_id,
        name: claims.name,
        email: claims.email,
        role: claims.role,
        is_active: true,
    })
}

/// POST /api/accounts — Create an account (admin only).
/// Notifies Staff and the dashboard view.
pub async fn create_account(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), (StatusCode, String)> {
    require_admin(&claims)?;

    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Name and email cannot be empty".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Hash: {}", e)))?;

    let db = state.db.clone();
    let name = req.name.clone();
    let email = req.email.clone();
    let role = req.role;

    let account = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        conn.execute(
            "INSERT INTO system_accounts (name, email, password_hash, role, is_active) VALUES (?1, ?2, ?3, ?4, 1)",
            rusqlite::params![name, email, password_hash, role],
        )
        .map_err(|e| (StatusCode::CONFLICT, format!("Insert account: {}", e)))?;

        Ok::<_, (StatusCode, String)>(Account {
            id: conn.last_insert_rowid(),
            name,
            email,
            role,
            is_active: true,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state.hub.notify_new_account(&account.name);
    state.hub.notify_dashboard_update(
        DashboardEventType::Create,
        DashboardEntityType::Account,
        &format!("New account created: {}", account.name),
    );

    Ok((StatusCode::CREATED, Json(account)))
}

/// PUT /api/accounts/{id} — Update an account (admin only).
/// Flipping is_active off broadcasts the deactivation, force-logs-out the
/// account's connections, and revokes its server-side sessions.
pub async fn update_account(
    State(state): State<AppState>,
    claims: Claims,
    Path(account_id): Path<i64>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Json<Account>, (StatusCode, String)> {
    require_admin(&claims)?;

    let password_hash = match &req.password {
        Some(password) => Some(
            hash_password(password)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Hash: {}", e)))?,
        ),
        None => None,
    };

    let db = state.db.clone();
    let name = req.name.clone();
    let role = req.role;
    let is_active = req.is_active;

    let (account, was_active) = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let was_active: bool = conn
            .query_row(
                "SELECT is_active FROM system_accounts WHERE id = ?1",
                [account_id],
                |row| row.get(0),
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "Account not found".to_string()))?;

        conn.execute(
            "UPDATE system_accounts SET name = ?1, role = ?2, is_active = ?3 WHERE id = ?4",
            rusqlite::params![name, role, is_active, account_id],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update account: {}", e)))?;

        if let Some(hash) = password_hash {
            conn.execute(
                "UPDATE system_accounts SET password_hash = ?1 WHERE id = ?2",
                rusqlite::params![hash, account_id],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update password: {}", e)))?;
        }

        let account = conn
            .query_row(
                "SELECT id, name, email, role, is_active FROM system_accounts WHERE id = ?1",
                [account_id],
                |row| {
                    Ok(Account {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        role: row.get(3)?,
                        is_active: row.get(4)?,
                    })
                },
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Read account: {}", e)))?;

        Ok::<_, (StatusCode, String)>((account, was_active))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    if was_active && !account.is_active {
        state.sessions.revoke_account(account.id);
        state.hub.notify_account_deactivated(account.id);
        state.hub.force_logout_account(account.id, Some("account_deactivated"));
    }
    state.hub.notify_dashboard_update(
        DashboardEventType::Update,
        DashboardEntityType::Account,
        &format!("Account updated: {}", account.name),
    );

    Ok(Json(account))
}

/// DELETE /api/accounts/{id} — Delete an account (admin only).
/// Refused while the account still owns articles. Deleting an account is
/// announced the same way as a deactivation, plus a force-logout.
pub async fn delete_account(
    State(state): State<AppState>,
    claims: Claims,
    Path(account_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    require_admin(&claims)?;

    if account_id == claims.account_id {
        return Err((
            StatusCode::BAD_REQUEST,
            "Cannot delete your own account".to_string(),
        ));
    }

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let article_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM news_articles WHERE created_by = ?1",
                [account_id],
                |row| row.get(0),
            )
            .unwrap_or(0);
        if article_count > 0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "Cannot delete an account that owns articles".to_string(),
            ));
        }

        let rows = conn
            .execute("DELETE FROM system_accounts WHERE id = ?1", [account_id])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete account: {}", e)))?;
        if rows == 0 {
            return Err((StatusCode::NOT_FOUND, "Account not found".to_string()));
        }
        Ok::<_, (StatusCode, String)>(())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state.sessions.revoke_account(account_id);
    state.hub.notify_account_deactivated(account_id);
    state.hub.force_logout_account(account_id, Some("account_deleted"));
    state.hub.notify_dashboard_update(
        DashboardEventType::Delete,
        DashboardEntityType::Account,
        &format!("Account #{} deleted", account_id),
    );

    Ok(StatusCode::OK)
}
