//! Login/logout endpoints backed by the session store.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::session::SessionClaims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "accountId")]
    pub account_id: i64,
    pub name: String,
    pub email: String,
    pub role: i32,
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(hash) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

/// POST /api/auth/login — Verify credentials and issue a session token.
/// Deactivated accounts cannot log in. Rate limited per IP at the router.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let email = req.email.clone();

    let account = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        conn.query_row(
            "SELECT id, name, email, password_hash, role, is_active FROM system_accounts WHERE email = ?1",
            [&email],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i32>(4)?,
                    row.get::<_, bool>(5)?,
                ))
            },
        )
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    let (id, name, email, password_hash, role, is_active) = account;

    if !verify_password(&req.password, &password_hash) {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        ));
    }

    if !is_active {
        return Err((
            StatusCode::FORBIDDEN,
            "Account has been deactivated".to_string(),
        ));
    }

    let token = state.sessions.issue(SessionClaims {
        account_id: id,
        name: name.clone(),
        email: email.clone(),
        role,
    });

    tracing::info!(account_id = id, role = role, "Login succeeded");

    Ok(Json(LoginResponse {
        token,
        account_id: id,
        name,
        email,
        role,
    }))
}

/// POST /api/auth/logout — Drop the caller's session.
/// Always succeeds; a missing or unknown token has nothing to drop.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        state.sessions.revoke(token);
    }
    StatusCode::OK
}
