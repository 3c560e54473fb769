//! Comment posting and moderation.
//!
//! Admins cannot comment — they moderate. Deletion is soft (the row keeps
//! who removed it and when) and produces exactly two hub dispatches: a
//! moderation notice to the author and a removal signal to the article page.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::hub::events::{DashboardEntityType, DashboardEventType};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostCommentRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    #[serde(rename = "commentId")]
    pub comment_id: i64,
    pub user: String,
    pub message: String,
    pub timestamp: String,
}

/// POST /api/articles/{id}/comments — Post a comment (logged-in, non-admin).
/// The comment is pushed live to everyone on the article's page.
pub async fn post_comment(
    State(state): State<AppState>,
    claims: Claims,
    Path(article_id): Path<String>,
    Json(req): Json<PostCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), (StatusCode, String)> {
    // Admins cannot comment - only moderate
    if claims.is_admin() {
        return Err((
            StatusCode::FORBIDDEN,
            "Admins cannot post comments".to_string(),
        ));
    }

    if req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Message cannot be empty".to_string(),
        ));
    }

    let db = state.db.clone();
    let aid = article_id.clone();
    let account_id = claims.account_id;
    let message = req.message.clone();

    let comment_id = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM news_articles WHERE id = ?1",
                [&aid],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .unwrap_or(false);
        if !exists {
            return Err((StatusCode::NOT_FOUND, "Article not found".to_string()));
        }

        conn.execute(
            "INSERT INTO comments (article_id, account_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![aid, account_id, message, Utc::now().to_rfc3339()],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert comment: {}", e)))?;

        Ok::<_, (StatusCode, String)>(conn.last_insert_rowid())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state
        .hub
        .notify_comment(&article_id, comment_id, &claims.name, &req.message);
    state.hub.notify_dashboard_update(
        DashboardEventType::Create,
        DashboardEntityType::Comment,
        &format!("New comment by {} on article {}", claims.name, article_id),
    );

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            comment_id,
            user: claims.name,
            message: req.message,
            timestamp: crate::hub::events::event_timestamp(),
        }),
    ))
}

/// DELETE /api/comments/{id} — Soft-delete a comment (admin only).
pub async fn delete_comment(
    State(state): State<AppState>,
    claims: Claims,
    Path(comment_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    if !claims.is_admin() {
        return Err((
            StatusCode::FORBIDDEN,
            "Only admins can delete comments".to_string(),
        ));
    }

    let db = state.db.clone();
    let admin_id = claims.account_id;

    let (author_id, article_id) = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let (author_id, article_id): (i64, String) = conn
            .query_row(
                "SELECT account_id, article_id FROM comments WHERE id = ?1 AND is_deleted = 0",
                [comment_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "Comment not found".to_string()))?;

        conn.execute(
            "UPDATE comments SET is_deleted = 1, deleted_by = ?1, deleted_at = ?2 WHERE id = ?3",
            rusqlite::params![admin_id, Utc::now().to_rfc3339(), comment_id],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete comment: {}", e)))?;

        Ok::<_, (StatusCode, String)>((author_id, article_id))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state
        .hub
        .notify_comment_deleted(author_id, &article_id, comment_id, &claims.name);
    state.hub.notify_dashboard_update(
        DashboardEventType::Delete,
        DashboardEntityType::Comment,
        &format!("Comment #{} deleted by {}", comment_id, claims.name),
    );

    Ok(StatusCode::OK)
}
