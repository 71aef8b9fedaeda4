//! Database module for SQLite persistence
//!
//! Holds the entity repositories (documents, lessons, files, categories,
//! users) and the shared filter/query builder.

pub mod categories;
pub mod documents;
pub mod files;
pub mod filter;
pub mod lessons;
mod schema;
pub mod users;

pub use categories::*;
pub use documents::*;
pub use files::*;
pub use lessons::*;
pub use schema::initialize_schema;
pub use users::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::Result;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    schema::initialize_schema(&pool).await?;

    Ok(pool)
}

/// A page of query results with the unpaginated total.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    schema::initialize_schema(&pool).await.expect("schema");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_creates_missing_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.db");
        let url = format!("sqlite:{}", path.display());

        let pool = create_pool(&url).await.expect("pool");
        assert!(path.exists());

        // Schema ran: the entity tables answer queries.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&pool)
            .await
            .expect("documents table exists");
        assert_eq!(count, 0);
    }
}
