//! Category CRUD. Every mutation signals Staff with a toast and every
//! connection with a list-reload, plus a dashboard activity entry.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::middleware::{require_staff, Claims};
use crate::db::models::Category;
use crate::hub::events::{DashboardEntityType, DashboardEventType};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// GET /api/categories — List all categories. Public.
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, (StatusCode, String)> {
    let db = state.db.clone();
    let categories = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        let mut stmt = conn
            .prepare("SELECT id, name, description, parent_id, is_active FROM categories ORDER BY name")
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Prepare".to_string()))?;
        let categories: Vec<Category> = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    parent_id: row.get(3)?,
                    is_active: row.get(4)?,
                })
            })
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Query".to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok::<_, (StatusCode, String)>(categories)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(categories))
}

/// POST /api/categories — Create a category (staff).
pub async fn create_category(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), (StatusCode, String)> {
    require_staff(&claims)?;

    if req.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Category name cannot be empty".to_string(),
        ));
    }

    let db = state.db.clone();
    let category = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        conn.execute(
            "INSERT INTO categories (name, description, parent_id, is_active) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![req.name, req.description, req.parent_id, req.is_active],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert category: {}", e)))?;

        Ok::<_, (StatusCode, String)>(Category {
            id: conn.last_insert_rowid(),
            name: req.name,
            description: req.description,
            parent_id: req.parent_id,
            is_active: req.is_active,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state
        .hub
        .notify_category_changed(&format!("New category created: {}", category.name));
    state.hub.notify_dashboard_update(
        DashboardEventType::Create,
        DashboardEntityType::Category,
        &format!("Category created: {}", category.name),
    );

    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/{id} — Update a category (staff).
pub async fn update_category(
    State(state): State<AppState>,
    claims: Claims,
    Path(category_id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, (StatusCode, String)> {
    require_staff(&claims)?;

    let db = state.db.clone();
    let category = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        let rows = conn
            .execute(
                "UPDATE categories SET name = ?1, description = ?2, parent_id = ?3, is_active = ?4 WHERE id = ?5",
                rusqlite::params![req.name, req.description, req.parent_id, req.is_active, category_id],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update category: {}", e)))?;
        if rows == 0 {
            return Err((StatusCode::NOT_FOUND, "Category not found".to_string()));
        }
        Ok::<_, (StatusCode, String)>(Category {
            id: category_id,
            name: req.name,
            description: req.description,
            parent_id: req.parent_id,
            is_active: req.is_active,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state
        .hub
        .notify_category_changed(&format!("Category updated: {}", category.name));
    state.hub.notify_dashboard_update(
        DashboardEventType::Update,
        DashboardEntityType::Category,
        &format!("Category updated: {}", category.name),
    );

    Ok(Json(category))
}

/// DELETE /api/categories/{id} — Delete a category (staff).
/// Refused with 400 while articles still reference it.
pub async fn delete_category(
    State(state): State<AppState>,
    claims: Claims,
    Path(category_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    require_staff(&claims)?;

    let db = state.db.clone();
    let name = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let article_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM news_articles WHERE category_id = ?1",
                [category_id],
                |row| row.get(0),
            )
            .unwrap_or(0);
        if article_count > 0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "Cannot delete a category with articles".to_string(),
            ));
        }

        let name: String = conn
            .query_row(
                "SELECT name FROM categories WHERE id = ?1",
                [category_id],
                |row| row.get(0),
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "Category not found".to_string()))?;

        conn.execute("DELETE FROM categories WHERE id = ?1", [category_id])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete category: {}", e)))?;

        Ok::<_, (StatusCode, String)>(name)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    state
        .hub
        .notify_category_changed(&format!("Category deleted: {}", name));
    state.hub.notify_dashboard_update(
        DashboardEventType::Delete,
        DashboardEntityType::Category,
        &format!("Category deleted: {}", name),
    );

    Ok(StatusCode::OK)
}
