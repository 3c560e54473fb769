//! Article CRUD and publishing, with the hub triggers for each mutation.
//!
//! Reads are public; writes are staff-gated, and deletion is restricted to
//! the author or an admin. Deleting an article removes its comments first.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::{require_staff, Claims};
use crate::db::models::{article_from_row, Article, Comment, Tag};
use crate::hub::events::{DashboardEntityType, DashboardEventType};
use crate::state::AppState;

const ARTICLE_COLUMNS: &str = "id, title, headline, content, source, category_id, is_published, created_by, updated_by, created_at, modified_at";

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub title: String,
    #[serde(default)]
    pub headline: String,
    pub content: String,
    #[serde(default)]
    pub source: String,
    #[serde(rename = "categoryId")]
    pub category_id: i64,
    #[serde(rename = "isPublished", default)]
    pub is_published: bool,
    #[serde(rename = "tagIds", default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ArticleDetails {
    #[serde(flatten)]
    pub article: Article,
    pub tags: Vec<Tag>,
    pub comments: Vec<Comment>,
    pub related: Vec<Article>,
}

/// GET /api/articles — List published articles, newest first. Public.
pub async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<Article>>, (StatusCode, String)> {
    let db = state.db.clone();
    let articles = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM news_articles WHERE is_published = 1 ORDER BY created_at DESC",
                ARTICLE_COLUMNS
            ))
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Prepare".to_string()))?;
        let articles: Vec<Article> = stmt
            .query_map([], article_from_row)
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Query".to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok::<_, (StatusCode, String)>(articles)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(articles))
}

/// GET /api/articles/mine — Articles authored by the caller (staff).
pub async fn my_articles(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<Article>>, (StatusCode, String)> {
    require_staff(&claims)?;

    let db = state.db.clone();
    let author = claims.account_id;
    let articles = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM news_articles WHERE created_by = ?1 ORDER BY created_at DESC",
                ARTICLE_COLUMNS
            ))
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Prepare".to_string()))?;
        let articles: Vec<Article> = stmt
            .query_map([author], article_from_row)
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Query".to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok::<_, (StatusCode, String)>(articles)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(articles))
}

/// GET /api/articles/{id} — Article details with tags, live comments, and up
/// to 3 related articles from the same category. Public.
pub async fn get_article(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> Result<Json<ArticleDetails>, (StatusCode, String)> {
    let db = state.db.clone();
    let details = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let article = conn
            .query_row(
                &format!("SELECT {} FROM news_articles WHERE id = ?1", ARTICLE_COLUMNS),
                [&article_id],
                article_from_row,
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "Article not found".to_string()))?;

        let mut tag_stmt = conn
            .prepare(
                "SELECT t.id, t.name, t.note FROM tags t \
                 JOIN article_tags at ON at.tag_id = t.id WHERE at.article_id = ?1 ORDER BY t.name",
            )
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Prepare".to_string()))?;
        let tags: Vec<Tag> = tag_stmt
            .query_map([&article_id], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    note: row.get(2)?,
                })
            })
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Query".to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        let mut comment_stmt = conn
            .prepare(
                "SELECT c.id, c.article_id, c.account_id, a.name, c.content, c.created_at \
                 FROM comments c JOIN system_accounts a ON a.id = c.account_id \
                 WHERE c.article_id = ?1 AND c.is_deleted = 0 ORDER BY c.created_at",
            )
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Prepare".to_string()))?;
        let comments: Vec<Comment> = comment_stmt
            .query_map([&article_id], |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    article_id: row.get(1)?,
                    account_id: row.get(2)?,
                    user: row.get(3)?,
                    content: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Query".to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        let mut related_stmt = conn
            .prepare(&format!(
                "SELECT {} FROM news_articles \
                 WHERE category_id = ?1 AND id != ?2 AND is_published = 1 \
                 ORDER BY created_at DESC LIMIT 3",
                ARTICLE_COLUMNS
            ))
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Prepare".to_string()))?;
        let related: Vec<Article> = related_stmt
            .query_map(
                rusqlite::params![article.category_id, article_id],
                article_from_row,
            )
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Query".to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        Ok::<_, (StatusCode, String)>(ArticleDetails {
            article,
            tags,
            comments,
            related,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(details))
}

/// POST /api/articles — Create an article (staff). Publishing immediately
/// announces it to every connection.
pub async fn create_article(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<ArticleRequest>,
) -> Result<(StatusCode, Json<Article>), (StatusCode, String)> {
    require_staff(&claims)?;

    if req.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Article title cannot be empty".to_string(),
        ));
    }

    let db = state.db.clone();
    let author_id = claims.account_id;
    let article = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let cat_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM categories WHERE id = ?1",
                [req.category_id],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .unwrap_or(false);
        if !cat_exists {
            return Err((StatusCode::BAD_REQUEST, "Category not found".to_string()));
        }

        let article_id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO news_articles (id, title, headline, content, source, category_id, is_published, created_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                article_id,
                req.title,
                req.headline,
                req.content,
                req.source,
                req.category_id,
                req.is_published,
                author_id,
                now
            ],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert article: {}", e)))?;

        for tag_id in &req.tag_ids {
            conn.execute(
                "INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?1, ?2)",
                rusqlite::params![article_id, tag_id],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Tag article: {}", e)))?;
        }

        Ok::<_, (StatusCode, String)>(Article {
            id: article_id,
            title: req.title,
            headline: req.headline,
            content: req.content,
            source: req.source,
            category_id: req.category_id,
            is_published: req.is_published,
            created_by: author_id,
            updated_by: None,
            created_at: now,
            modified_at: None,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    if article.is_published {
        state.hub.notify_new_article(&claims.name, &article.title);
        state.hub.notify_dashboard_update(
            DashboardEventType::Publish,
            DashboardEntityType::Article,
            &format!("Article published: {} by {}", article.title, claims.name),
        );
    } else {
        state.hub.notify_dashboard_update(
            DashboardEventType::Create,
            DashboardEntityType::Article,
            &format!("Draft created: {} by {}", article.title, claims.name),
        );
    }

    Ok((StatusCode::CREATED, Json(article)))
}

/// PUT /api/articles/{id} — Update an article (staff).
/// Viewers of the article page get the new content; Admin/Staff lists get a
/// reload signal.
pub async fn update_article(
    State(state): State<AppState>,
    claims: Claims,
    Path(article_id): Path<String>,
    Json(req): Json<ArticleRequest>,
) -> Result<Json<Article>, (StatusCode, String)> {
    require_staff(&claims)?;

    let db = state.db.clone();
    let editor_id = claims.account_id;
    let aid = article_id.clone();
    let article = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let now = Utc::now().to_rfc3339();
        let rows = conn
            .execute(
                "UPDATE news_articles SET title = ?1, headline = ?2, content = ?3, source = ?4, \
                 category_id = ?5, is_published = ?6, updated_by = ?7, modified_at = ?8 WHERE id = ?9",
                rusqlite::params![
                    req.title,
                    req.headline,
                    req.content,
                    req.source,
                    req.category_id,
                    req.is_published,
                    editor_id,
                    now,
                    aid
                ],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update article: {}", e)))?;
        if rows == 0 {
            return Err((StatusCode::NOT_FOUND, "Article not found".to_string()));
        }

        conn.execute("DELETE FROM article_tags WHERE article_id = ?1", [&aid])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Untag article: {}", e)))?;
        for tag_id in &req.tag_ids {
            conn.execute(
                "INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?1, ?2)",
                rusqlite::params![aid, tag_id],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Tag article: {}", e)))?;
        }

        conn.query_row(
            &format!("SELECT {} FROM news_articles WHERE id = ?1", ARTICLE_COLUMNS),
            [&aid],
            article_from_row,
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Read article: {}", e)))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state
        .hub
        .notify_article_update(&article.id, &article.title, &article.content);
    state.hub.notify_dashboard_update(
        DashboardEventType::Update,
        DashboardEntityType::Article,
        &format!("Article updated: {} by {}", article.title, claims.name),
    );

    Ok(Json(article))
}

/// DELETE /api/articles/{id} — Delete an article (author or admin).
/// The article's comments are removed first, then everyone is told the
/// article is gone and admins get a counts-changed signal.
pub async fn delete_article(
    State(state): State<AppState>,
    claims: Claims,
    Path(article_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    require_staff(&claims)?;

    let db = state.db.clone();
    let aid = article_id.clone();
    let caller = claims.account_id;
    let is_admin = claims.is_admin();
    let title = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let (title, created_by): (String, i64) = conn
            .query_row(
                "SELECT title, created_by FROM news_articles WHERE id = ?1",
                [&aid],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "Article not found".to_string()))?;

        if created_by != caller && !is_admin {
            return Err((
                StatusCode::FORBIDDEN,
                "Only the author or an admin can delete this article".to_string(),
            ));
        }

        // Comments reference the article without cascade; remove them first.
        conn.execute("DELETE FROM comments WHERE article_id = ?1", [&aid])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete comments: {}", e)))?;
        conn.execute("DELETE FROM news_articles WHERE id = ?1", [&aid])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete article: {}", e)))?;

        Ok::<_, (StatusCode, String)>(title)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state.hub.notify_article_deleted(&article_id, &title);
    state.hub.notify_dashboard_counts_changed();
    state.hub.notify_dashboard_update(
        DashboardEventType::Delete,
        DashboardEntityType::Article,
        &format!("Article deleted: {} by {}", title, claims.name),
    );

    Ok(StatusCode::OK)
}
