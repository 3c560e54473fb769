//! Row types shared between handlers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: i32,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub headline: String,
    pub content: String,
    pub source: String,
    #[serde(rename = "categoryId")]
    pub category_id: i64,
    #[serde(rename = "isPublished")]
    pub is_published: bool,
    #[serde(rename = "createdBy")]
    pub created_by: i64,
    #[serde(rename = "updatedBy")]
    pub updated_by: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "modifiedAt")]
    pub modified_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(rename = "articleId")]
    pub article_id: String,
    #[serde(rename = "accountId")]
    pub account_id: i64,
    pub user: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Map a news_articles row (column order: id, title, headline, content,
/// source, category_id, is_published, created_by, updated_by, created_at,
/// modified_at) into an Article.
pub fn article_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        headline: row.get(2)?,
        content: row.get(3)?,
        source: row.get(4)?,
        category_id: row.get(5)?,
        is_published: row.get(6)?,
        created_by: row.get(7)?,
        updated_by: row.get(8)?,
        created_at: row.get(9)?,
        modified_at: row.get(10)?,
    })
}
