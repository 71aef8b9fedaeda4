//! Document repository
//!
//! Rich-text content records with export support. `content` is stored as the
//! raw editor HTML and must always pass through the sanitizer before being
//! rendered anywhere.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::filter::{build_predicate, Bind, FilterConfig, PageRequest, DOCUMENT_COLUMNS};
use crate::db::{CategoryRepo, Page, UserRepo};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub classes: Json<Vec<i64>>,
    pub category_id: Option<String>,
    pub owner_id: String,
    /// Owner display name snapshotted at write time; not kept in sync with
    /// later user renames.
    pub owner_name: String,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub classes: Vec<i64>,
    #[serde(default)]
    pub category_id: Option<String>,
    pub owner_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; only provided fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub classes: Option<Vec<i64>>,
    pub category_id: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// Creation counts bucketed by recency.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total: i64,
    pub total_this_month: i64,
    pub total_this_week: i64,
    pub total_today: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

pub struct DocumentRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<DocumentRecord> {
        sqlx::query_as::<_, DocumentRecord>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document {}", id)))
    }

    pub async fn create(&self, new: NewDocument) -> Result<DocumentRecord> {
        if new.title.trim().is_empty() {
            return Err(AppError::InvalidInput("document title is required".into()));
        }
        let owner = UserRepo::new(self.pool).get(&new.owner_id).await?;
        if let Some(category_id) = new.category_id.as_deref() {
            CategoryRepo::new(self.pool).get(category_id).await?;
        }

        let now = Utc::now();
        let record = DocumentRecord {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            content: new.content,
            classes: Json(new.classes),
            category_id: new.category_id,
            owner_id: owner.id,
            owner_name: owner.name,
            tags: Json(new.tags),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO documents
                (id, title, description, content, classes, category_id,
                 owner_id, owner_name, tags, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.content)
        .bind(&record.classes)
        .bind(&record.category_id)
        .bind(&record.owner_id)
        .bind(&record.owner_name)
        .bind(&record.tags)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool)
        .await?;

        Ok(record)
    }

    pub async fn update(&self, id: &str, update: DocumentUpdate) -> Result<DocumentRecord> {
        let mut record = self.get(id).await?;

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(AppError::InvalidInput("document title is required".into()));
            }
            record.title = title;
        }
        if let Some(description) = update.description {
            record.description = Some(description);
        }
        if let Some(content) = update.content {
            record.content = content;
        }
        if let Some(classes) = update.classes {
            record.classes = Json(classes);
        }
        if let Some(category_id) = update.category_id {
            if let Some(id) = category_id.as_deref() {
                CategoryRepo::new(self.pool).get(id).await?;
            }
            record.category_id = category_id;
        }
        if let Some(tags) = update.tags {
            record.tags = Json(tags);
        }
        record.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE documents
            SET title = ?, description = ?, content = ?, classes = ?,
                category_id = ?, tags = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.content)
        .bind(&record.classes)
        .bind(&record.category_id)
        .bind(&record.tags)
        .bind(record.updated_at)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(record)
    }

    /// Delete a document. Lessons referencing it keep the dangling id.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("document {}", id)));
        }
        Ok(())
    }

    /// Filtered, paginated listing through the shared predicate builder.
    pub async fn find_filtered(
        &self,
        filter: &FilterConfig,
        page: PageRequest,
    ) -> Result<Page<DocumentRecord>> {
        let (predicate, binds) = build_predicate(filter, &DOCUMENT_COLUMNS, Utc::now());
        let where_clause = if predicate.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", predicate)
        };

        let sql = format!(
            "SELECT * FROM documents{} ORDER BY {} LIMIT ? OFFSET ?",
            where_clause,
            filter.sort.as_order_by()
        );
        let mut query = sqlx::query_as::<_, DocumentRecord>(&sql);
        for bind in &binds {
            query = match bind {
                Bind::Text(s) => query.bind(s.clone()),
                Bind::Int(i) => query.bind(*i),
                Bind::Timestamp(t) => query.bind(*t),
            };
        }
        let items = query.bind(page.limit).bind(page.offset()).fetch_all(self.pool).await?;

        let count_sql = format!("SELECT COUNT(*) FROM documents{}", where_clause);
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

    /// Creation counts for all time, this month, this week and today.
    pub async fn statistics(&self, category_id: Option<&str>) -> Result<DocumentStats> {
        let now = Utc::now();
        let today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc();
        let week_ago = now - chrono::Duration::days(7);
        let month_start = now
            .date_naive()
            .with_day(1)
            .expect("first of month is valid")
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc();

        let total = self.count_since(category_id, None).await?;
        let total_this_month = self.count_since(category_id, Some(month_start)).await?;
        let total_this_week = self.count_since(category_id, Some(week_ago)).await?;
        let total_today = self.count_since(category_id, Some(today)).await?;

        Ok(DocumentStats {
            total,
            total_this_month,
            total_this_week,
            total_today,
        })
    }

    async fn count_since(
        &self,
        category_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let mut sql = "SELECT COUNT(*) FROM documents WHERE 1=1".to_string();
        if category_id.is_some() {
            sql.push_str(" AND category_id = ?");
        }
        if since.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(category_id) = category_id {
            query = query.bind(category_id.to_string());
        }
        if let Some(since) = since {
            query = query.bind(since);
        }
        Ok(query.fetch_one(self.pool).await?)
    }

    /// Tag frequency across documents, most frequent first.
    pub async fn popular_tags(
        &self,
        limit: usize,
        category_id: Option<&str>,
    ) -> Result<Vec<TagCount>> {
        let rows: Vec<(Json<Vec<String>>,)> = if let Some(category_id) = category_id {
            sqlx::query_as("SELECT tags FROM documents WHERE category_id = ?")
                .bind(category_id)
                .fetch_all(self.pool)
                .await?
        } else {
            sqlx::query_as("SELECT tags FROM documents")
                .fetch_all(self.pool)
                .await?
        };

        let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for (Json(tags),) in rows {
            for tag in tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        ranked.truncate(limit);
        Ok(ranked)
    }
}
