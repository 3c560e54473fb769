//! Tag CRUD. Mutations notify all three role groups.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::middleware::{require_staff, Claims};
use crate::db::models::Tag;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: String,
    #[serde(default)]
    pub note: String,
}

/// GET /api/tags — List all tags. Public.
pub async fn list_tags(
    State(state): State<AppState>,
) -> Result<Json<Vec<Tag>>, (StatusCode, String)> {
    let db = state.db.clone();
    let tags = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        let mut stmt = conn
            .prepare("SELECT id, name, note FROM tags ORDER BY name")
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Prepare".to_string()))?;
        let tags: Vec<Tag> = stmt
            .query_map([], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    note: row.get(2)?,
                })
            })
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Query".to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok::<_, (StatusCode, String)>(tags)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(tags))
}

/// POST /api/tags — Create a tag (staff).
pub async fn create_tag(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<TagRequest>,
) -> Result<(StatusCode, Json<Tag>), (StatusCode, String)> {
    require_staff(&claims)?;

    if req.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Tag name cannot be empty".to_string(),
        ));
    }

    let db = state.db.clone();
    let tag = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        conn.execute(
            "INSERT INTO tags (name, note) VALUES (?1, ?2)",
            rusqlite::params![req.name, req.note],
        )
        .map_err(|e| (StatusCode::CONFLICT, format!("Insert tag: {}", e)))?;

        Ok::<_, (StatusCode, String)>(Tag {
            id: conn.last_insert_rowid(),
            name: req.name,
            note: req.note,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state.hub.notify_tag_created(tag.id, &tag.name, &tag.note);

    Ok((StatusCode::CREATED, Json(tag)))
}

/// PUT /api/tags/{id} — Update a tag (staff).
pub async fn update_tag(
    State(state): State<AppState>,
    claims: Claims,
    Path(tag_id): Path<i64>,
    Json(req): Json<TagRequest>,
) -> Result<Json<Tag>, (StatusCode, String)> {
    require_staff(&claims)?;

    let db = state.db.clone();
    let tag = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        let rows = conn
            .execute(
                "UPDATE tags SET name = ?1, note = ?2 WHERE id = ?3",
                rusqlite::params![req.name, req.note, tag_id],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update tag: {}", e)))?;
        if rows == 0 {
            return Err((StatusCode::NOT_FOUND, "Tag not found".to_string()));
        }
        Ok::<_, (StatusCode, String)>(Tag {
            id: tag_id,
            name: req.name,
            note: req.note,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state.hub.notify_tag_updated(tag.id, &tag.name, &tag.note);

    Ok(Json(tag))
}

/// DELETE /api/tags/{id} — Delete a tag (staff).
pub async fn delete_tag(
    State(state): State<AppState>,
    claims: Claims,
    Path(tag_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    require_staff(&claims)?;

    let db = state.db.clone();
    let tag = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let tag: Tag = conn
            .query_row("SELECT id, name, note FROM tags WHERE id = ?1", [tag_id], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    note: row.get(2)?,
                })
            })
            .map_err(|_| (StatusCode::NOT_FOUND, "Tag not found".to_string()))?;

        conn.execute("DELETE FROM tags WHERE id = ?1", [tag_id])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete tag: {}", e)))?;

        Ok::<_, (StatusCode, String)>(tag)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state.hub.notify_tag_deleted(tag.id, &tag.name, &tag.note);

    Ok(StatusCode::OK)
}
