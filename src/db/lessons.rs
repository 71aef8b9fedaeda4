//! Lesson repository
//!
//! Lessons group up to ten files and ten documents for one class. Attachment
//! ids are validated against the store at write time with a count-equality
//! check; deletes elsewhere do not cascade, so reads must tolerate dangling
//! ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::filter::{build_predicate, Bind, FilterConfig, PageRequest, LESSON_COLUMNS};
use crate::db::{Page, UserRepo};
use crate::error::{AppError, Result};

/// Upper bound on attached files and on attached documents, each.
pub const MAX_ATTACHMENTS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub owner_name: String,
    pub class_id: i64,
    pub file_ids: Json<Vec<String>>,
    pub document_ids: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: String,
    pub class_id: i64,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub document_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub class_id: Option<i64>,
    pub file_ids: Option<Vec<String>>,
    pub document_ids: Option<Vec<String>>,
}

pub struct LessonRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LessonRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<LessonRecord> {
        sqlx::query_as::<_, LessonRecord>("SELECT * FROM lessons WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("lesson {}", id)))
    }

    pub async fn create(&self, new: NewLesson) -> Result<LessonRecord> {
        if new.title.trim().is_empty() {
            return Err(AppError::InvalidInput("lesson title is required".into()));
        }
        let owner = UserRepo::new(self.pool).get(&new.owner_id).await?;
        self.validate_attachments(&new.file_ids, &new.document_ids)
            .await?;

        let now = Utc::now();
        let record = LessonRecord {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            owner_id: owner.id,
            owner_name: owner.name,
            class_id: new.class_id,
            file_ids: Json(new.file_ids),
            document_ids: Json(new.document_ids),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO lessons
                (id, title, description, owner_id, owner_name, class_id,
                 file_ids, document_ids, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.owner_id)
        .bind(&record.owner_name)
        .bind(record.class_id)
        .bind(&record.file_ids)
        .bind(&record.document_ids)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool)
        .await?;

        Ok(record)
    }

    pub async fn update(&self, id: &str, update: LessonUpdate) -> Result<LessonRecord> {
        let mut record = self.get(id).await?;

        // Validate before any write so a failed update leaves the row alone.
        let file_ids = update.file_ids.as_deref().unwrap_or(&record.file_ids.0);
        let document_ids = update
            .document_ids
            .as_deref()
            .unwrap_or(&record.document_ids.0);
        self.validate_attachments(file_ids, document_ids).await?;

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(AppError::InvalidInput("lesson title is required".into()));
            }
            record.title = title;
        }
        if let Some(description) = update.description {
            record.description = Some(description);
        }
        if let Some(class_id) = update.class_id {
            record.class_id = class_id;
        }
        if let Some(file_ids) = update.file_ids {
            record.file_ids = Json(file_ids);
        }
        if let Some(document_ids) = update.document_ids {
            record.document_ids = Json(document_ids);
        }
        record.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE lessons
            SET title = ?, description = ?, class_id = ?, file_ids = ?,
                document_ids = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.class_id)
        .bind(&record.file_ids)
        .bind(&record.document_ids)
        .bind(record.updated_at)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("lesson {}", id)));
        }
        Ok(())
    }

    pub async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<LessonRecord>> {
        let rows = sqlx::query_as::<_, LessonRecord>(
            "SELECT * FROM lessons WHERE owner_id = ? ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_filtered(
        &self,
        filter: &FilterConfig,
        page: PageRequest,
    ) -> Result<Page<LessonRecord>> {
        let (predicate, binds) = build_predicate(filter, &LESSON_COLUMNS, Utc::now());
        let where_clause = if predicate.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", predicate)
        };

        let sql = format!(
            "SELECT * FROM lessons{} ORDER BY {} LIMIT ? OFFSET ?",
            where_clause,
            filter.sort.as_order_by()
        );
        let mut query = sqlx::query_as::<_, LessonRecord>(&sql);
        for bind in &binds {
            query = match bind {
                Bind::Text(s) => query.bind(s.clone()),
                Bind::Int(i) => query.bind(*i),
                Bind::Timestamp(t) => query.bind(*t),
            };
        }
        let items = query.bind(page.limit).bind(page.offset()).fetch_all(self.pool).await?;

        let count_sql = format!("SELECT COUNT(*) FROM lessons{}", where_clause);
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

    /// Attachment invariants: at most [`MAX_ATTACHMENTS`] of each kind, and
    /// every referenced id must currently resolve (count-equality check).
    async fn validate_attachments(&self, file_ids: &[String], document_ids: &[String]) -> Result<()> {
        if file_ids.len() > MAX_ATTACHMENTS {
            return Err(AppError::Validation(format!(
                "a lesson may reference at most {} files",
                MAX_ATTACHMENTS
            )));
        }
        if document_ids.len() > MAX_ATTACHMENTS {
            return Err(AppError::Validation(format!(
                "a lesson may reference at most {} documents",
                MAX_ATTACHMENTS
            )));
        }
        self.check_all_exist("files", file_ids).await?;
        self.check_all_exist("documents", document_ids).await?;
        Ok(())
    }

    async fn check_all_exist(&self, table: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE id IN ({})",
            table, placeholders
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let found = query.fetch_one(self.pool).await?;
        if found as usize != ids.len() {
            return Err(AppError::Validation(format!(
                "{} of {} referenced {} do not exist",
                ids.len() - found as usize,
                ids.len(),
                table
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::db::{DocumentRepo, NewDocument};

    async fn seed_owner(pool: &SqlitePool) -> String {
        UserRepo::new(pool)
            .create("Chi Le", "chi@school.vn", "teacher")
            .await
            .unwrap()
            .id
    }

    async fn seed_documents(pool: &SqlitePool, owner: &str, n: usize) -> Vec<String> {
        let repo = DocumentRepo::new(pool);
        let mut ids = Vec::new();
        for i in 0..n {
            let record = repo
                .create(NewDocument {
                    title: format!("doc-{}", i),
                    description: None,
                    content: String::new(),
                    classes: vec![],
                    category_id: None,
                    owner_id: owner.to_string(),
                    tags: vec![],
                })
                .await
                .unwrap();
            ids.push(record.id);
        }
        ids
    }

    fn lesson(owner: &str, document_ids: Vec<String>) -> NewLesson {
        NewLesson {
            title: "Bài 1".to_string(),
            description: None,
            owner_id: owner.to_string(),
            class_id: 5,
            file_ids: vec![],
            document_ids,
        }
    }

    #[tokio::test]
    async fn test_attachment_limit_of_ten() {
        let pool = test_pool().await;
        let owner = seed_owner(&pool).await;
        let ids = seed_documents(&pool, &owner, 11).await;
        let repo = LessonRepo::new(&pool);

        let err = repo.create(lesson(&owner, ids.clone())).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // No write happened.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Exactly ten is fine.
        let record = repo
            .create(lesson(&owner, ids[..10].to_vec()))
            .await
            .unwrap();
        assert_eq!(record.document_ids.0.len(), 10);
    }

    #[tokio::test]
    async fn test_unresolved_attachment_ids_fail_validation() {
        let pool = test_pool().await;
        let owner = seed_owner(&pool).await;
        let mut ids = seed_documents(&pool, &owner, 2).await;
        ids.push("missing-id".to_string());

        let err = LessonRepo::new(&pool)
            .create(lesson(&owner, ids))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_validates_before_writing() {
        let pool = test_pool().await;
        let owner = seed_owner(&pool).await;
        let ids = seed_documents(&pool, &owner, 11).await;
        let repo = LessonRepo::new(&pool);
        let record = repo.create(lesson(&owner, vec![])).await.unwrap();

        let err = repo
            .update(
                &record.id,
                LessonUpdate {
                    title: Some("changed".to_string()),
                    document_ids: Some(ids),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let unchanged = repo.get(&record.id).await.unwrap();
        assert_eq!(unchanged.title, "Bài 1");
    }

    #[tokio::test]
    async fn test_class_filter_is_exact_match() {
        let pool = test_pool().await;
        let owner = seed_owner(&pool).await;
        let repo = LessonRepo::new(&pool);
        repo.create(lesson(&owner, vec![])).await.unwrap();
        let mut other = lesson(&owner, vec![]);
        other.class_id = 7;
        other.title = "Bài 2".to_string();
        repo.create(other).await.unwrap();

        let filter = FilterConfig {
            class_id: Some(7),
            ..Default::default()
        };
        let page = repo.find_filtered(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Bài 2");
    }

    #[tokio::test]
    async fn test_delete_document_leaves_dangling_reference() {
        let pool = test_pool().await;
        let owner = seed_owner(&pool).await;
        let ids = seed_documents(&pool, &owner, 1).await;
        let repo = LessonRepo::new(&pool);
        let record = repo.create(lesson(&owner, ids.clone())).await.unwrap();

        DocumentRepo::new(&pool).delete(&ids[0]).await.unwrap();

        // No cascade: the lesson still lists the deleted id.
        let fetched = repo.get(&record.id).await.unwrap();
        assert_eq!(fetched.document_ids.0, ids);
    }
}
