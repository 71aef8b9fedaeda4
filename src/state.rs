//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::storage::S3Client;

/// Shared application state
///
/// The store and the S3 client are the only shared resources; repositories
/// are constructed per request over the pool, never held here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    s3_client: S3Client,
    db: SqlitePool,
}

impl AppState {
    pub fn new(config: Config, s3_client: S3Client, db: SqlitePool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                s3_client,
                db,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn s3_client(&self) -> &S3Client {
        &self.inner.s3_client
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }
}

/// State over an in-memory store and a client pointed at a dummy endpoint;
/// nothing in it reaches the network until a request actually uploads.
#[cfg(test)]
pub(crate) async fn test_state() -> AppState {
    let config = Config::default();
    let s3_client = S3Client::new(&config.storage)
        .await
        .expect("local client config");
    let db = crate::db::test_pool().await;
    AppState::new(config, s3_client, db)
}
