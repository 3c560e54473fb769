//! FUNews management server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod accounts;
pub mod articles;
pub mod auth;
pub mod categories;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod hub;
pub mod routes;
pub mod state;
pub mod tags;

use auth::login::hash_password;

/// Insert the configured admin account on first boot if no admin exists yet.
pub fn seed_admin_account(
    db: &db::DbPool,
    email: &str,
    password: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let conn = db.lock().map_err(|_| "DB lock poisoned")?;

    let admin_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM system_accounts WHERE role = ?1",
        [auth::ROLE_ADMIN],
        |row| row.get(0),
    )?;
    if admin_count > 0 {
        return Ok(false);
    }

    let password_hash = hash_password(password).map_err(|e| e.to_string())?;
    conn.execute(
        "INSERT INTO system_accounts (name, email, password_hash, role, is_active) VALUES (?1, ?2, ?3, ?4, 1)",
        rusqlite::params!["Administrator", email, password_hash, auth::ROLE_ADMIN],
    )?;

    Ok(true)
}
