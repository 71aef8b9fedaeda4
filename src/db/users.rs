//! User repository
//!
//! Users are referenced (never owned) by documents, lessons and files; their
//! display name is denormalized into those records at write time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

pub struct UserRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<UserRecord> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    pub async fn create(&self, name: &str, email: &str, role: &str) -> Result<UserRecord> {
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO users (id, name, email, role, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(&record.id)
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.role)
            .bind(record.created_at)
            .execute(self.pool)
            .await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = test_pool().await;
        let repo = UserRepo::new(&pool);
        let user = repo.create("An Nguyen", "an@school.vn", "teacher").await.unwrap();

        let fetched = repo.get(&user.id).await.unwrap();
        assert_eq!(fetched.name, "An Nguyen");
        assert_eq!(fetched.role, "teacher");

        let by_email = repo.find_by_email("an@school.vn").await.unwrap();
        assert!(by_email.is_some());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let pool = test_pool().await;
        let err = UserRepo::new(&pool).get("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
