//! File repository
//!
//! Stored media/binary asset references with opaque provider metadata. Rows
//! are created by the media upload adapter after the provider accepts the
//! bytes; nothing is persisted for failed uploads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::filter::{build_predicate, Bind, FilterConfig, PageRequest, FILE_COLUMNS};
use crate::db::Page;
use crate::error::{AppError, Result};
use crate::media::MediaKind;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub download_url: String,
    /// Storage key at the provider.
    pub public_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub size: i64,
    pub classes: Json<Vec<i64>>,
    pub category_id: Option<String>,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    /// Full provider response, kept opaque.
    pub detail: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub filename: String,
    pub url: String,
    pub download_url: String,
    pub public_id: String,
    pub kind: MediaKind,
    pub size: i64,
    pub classes: Vec<i64>,
    pub category_id: Option<String>,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    pub detail: serde_json::Value,
}

pub struct FileRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<FileRecord> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("file {}", id)))
    }

    pub async fn create(&self, new: NewFile) -> Result<FileRecord> {
        let record = FileRecord {
            id: Uuid::new_v4().to_string(),
            filename: new.filename,
            url: new.url,
            download_url: new.download_url,
            public_id: new.public_id,
            kind: new.kind.as_str().to_string(),
            size: new.size,
            classes: Json(new.classes),
            category_id: new.category_id,
            owner_id: new.owner_id,
            owner_name: new.owner_name,
            detail: Json(new.detail),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO files
                (id, filename, url, download_url, public_id, type, size,
                 classes, category_id, owner_id, owner_name, detail, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.filename)
        .bind(&record.url)
        .bind(&record.download_url)
        .bind(&record.public_id)
        .bind(&record.kind)
        .bind(record.size)
        .bind(&record.classes)
        .bind(&record.category_id)
        .bind(&record.owner_id)
        .bind(&record.owner_name)
        .bind(&record.detail)
        .bind(record.created_at)
        .execute(self.pool)
        .await?;

        Ok(record)
    }

    /// Delete the row only. Removing the provider object first is the
    /// adapter's job.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("file {}", id)));
        }
        Ok(())
    }

    pub async fn find_filtered(
        &self,
        filter: &FilterConfig,
        page: PageRequest,
    ) -> Result<Page<FileRecord>> {
        let (predicate, binds) = build_predicate(filter, &FILE_COLUMNS, Utc::now());
        let where_clause = if predicate.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", predicate)
        };

        let sql = format!(
            "SELECT * FROM files{} ORDER BY {} LIMIT ? OFFSET ?",
            where_clause,
            filter.sort.as_order_by()
        );
        let mut query = sqlx::query_as::<_, FileRecord>(&sql);
        for bind in &binds {
            query = match bind {
                Bind::Text(s) => query.bind(s.clone()),
                Bind::Int(i) => query.bind(*i),
                Bind::Timestamp(t) => query.bind(*t),
            };
        }
        let items = query.bind(page.limit).bind(page.offset()).fetch_all(self.pool).await?;

        let count_sql = format!("SELECT COUNT(*) FROM files{}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &binds {
            count_query = match bind {
                Bind::Text(s) => count_query.bind(s.clone()),
                Bind::Int(i) => count_query.bind(*i),
                Bind::Timestamp(t) => count_query.bind(*t),
            };
        }
        let total = count_query.fetch_one(self.pool).await?;

        Ok(Page { items, total })
    }
}
