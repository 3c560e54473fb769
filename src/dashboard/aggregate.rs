//! Read-side dashboard aggregates.
//!
//! The hub only ever signals that something changed; this endpoint is the
//! authoritative recompute the client re-fetches on `UpdateDashboardCounts`.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::{require_admin, Claims};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_articles: i64,
    pub published_articles: i64,
    pub draft_articles: i64,
    pub total_accounts: i64,
    pub active_accounts: i64,
    pub inactive_accounts: i64,
    pub total_categories: i64,
    pub total_comments: i64,
}

/// GET /api/dashboard/stats — Recompute aggregate counts on demand (admin).
/// Soft-deleted comments are excluded.
pub async fn get_stats(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<DashboardStats>, (StatusCode, String)> {
    require_admin(&claims)?;

    let db = state.db.clone();
    let stats = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let count = |sql: &str| -> Result<i64, (StatusCode, String)> {
            conn.query_row(sql, [], |row| row.get(0))
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Count: {}", e)))
        };

        Ok::<_, (StatusCode, String)>(DashboardStats {
            total_articles: count("SELECT COUNT(*) FROM news_articles")?,
            published_articles: count("SELECT COUNT(*) FROM news_articles WHERE is_published = 1")?,
            draft_articles: count("SELECT COUNT(*) FROM news_articles WHERE is_published = 0")?,
            total_accounts: count("SELECT COUNT(*) FROM system_accounts")?,
            active_accounts: count("SELECT COUNT(*) FROM system_accounts WHERE is_active = 1")?,
            inactive_accounts: count("SELECT COUNT(*) FROM system_accounts WHERE is_active = 0")?,
            total_categories: count("SELECT COUNT(*) FROM categories")?,
            total_comments: count("SELECT COUNT(*) FROM comments WHERE is_deleted = 0")?,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(stats))
}
