//! Category repository
//!
//! Categories group documents and files; each carries a URL-safe unique slug
//! derived from its name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Derive a URL-safe slug from a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

pub struct CategoryRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<CategoryRecord> {
        sqlx::query_as::<_, CategoryRecord>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category {}", id)))
    }

    pub async fn list(&self) -> Result<Vec<CategoryRecord>> {
        let rows = sqlx::query_as::<_, CategoryRecord>("SELECT * FROM categories ORDER BY name ASC")
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create(&self, name: &str, owner_id: Option<&str>) -> Result<CategoryRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("category name is required".into()));
        }
        let slug = slugify(name);
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM categories WHERE slug = ?")
                .bind(&slug)
                .fetch_optional(self.pool)
                .await?;
        if existing.is_some() {
            return Err(AppError::Validation(format!(
                "category slug '{}' already exists",
                slug
            )));
        }

        let record = CategoryRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            slug,
            owner_id: owner_id.map(str::to_string),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO categories (id, name, slug, owner_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.slug)
        .bind(&record.owner_id)
        .bind(record.created_at)
        .execute(self.pool)
        .await?;
        Ok(record)
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<CategoryRecord> {
        let mut record = self.get(id).await?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("category name is required".into()));
        }
        record.name = name.to_string();
        record.slug = slugify(name);
        sqlx::query("UPDATE categories SET name = ?, slug = ? WHERE id = ?")
            .bind(&record.name)
            .bind(&record.slug)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(record)
    }

    /// Delete a category. Documents and files keep their category reference
    /// dangling; there is no cascade at the store level.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("category {}", id)));
        }
        Ok(())
    }
}
