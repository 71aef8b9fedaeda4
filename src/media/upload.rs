//! Upload adapter
//!
//! Bridges multipart uploads to the object store and the file repository.
//! Order matters: the owner is resolved before any bytes leave the process,
//! and the database row is written only after the provider has accepted the
//! object. A failed upload persists nothing.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::config::AudioClassification;
use crate::db::files::{FileRepo, FileRecord, NewFile};
use crate::db::users::UserRepo;
use crate::error::{AppError, Result};
use crate::media::{sanitize_file_name, strip_extension, MediaKind};
use crate::storage::{PutResult, S3Client, StorageError};

/// Provider seam for the upload adapter.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> std::result::Result<PutResult, StorageError>;

    async fn delete(&self, key: &str) -> std::result::Result<(), StorageError>;

    fn url(&self, key: &str) -> String;
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> std::result::Result<PutResult, StorageError> {
        self.put_object(key, data, content_type).await
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), StorageError> {
        self.delete_object(key).await
    }

    fn url(&self, key: &str) -> String {
        self.object_url(key)
    }
}

/// An incoming file handle, as extracted from a multipart field.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Optional metadata accompanying an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadExtra {
    pub folder: Option<String>,
    pub classes: Vec<i64>,
    pub category_id: Option<String>,
    pub owner_id: Option<String>,
}

pub struct MediaUploader<'a> {
    store: &'a dyn ObjectStore,
    pool: &'a SqlitePool,
    audio: AudioClassification,
}

impl<'a> MediaUploader<'a> {
    pub fn new(store: &'a dyn ObjectStore, pool: &'a SqlitePool, audio: AudioClassification) -> Self {
        Self { store, pool, audio }
    }

    /// Push an uploaded file to the provider and persist its reference.
    pub async fn upload(&self, file: UploadedFile, extra: UploadExtra) -> Result<FileRecord> {
        if file.filename.is_empty() {
            return Err(AppError::InvalidInput("missing filename".to_string()));
        }
        if file.bytes.is_empty() {
            return Err(AppError::InvalidInput("empty file".to_string()));
        }

        // Resolve the owner before touching the provider, so a bad owner id
        // fails without a stray object being written.
        let owner = match &extra.owner_id {
            Some(id) => Some(UserRepo::new(self.pool).get(id).await?),
            None => None,
        };

        let content_type = file.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&file.filename)
                .first_or_octet_stream()
                .to_string()
        });
        let kind = MediaKind::from_mime(&content_type, self.audio);

        let folder = extra.folder.as_deref().unwrap_or("general");
        let key = storage_key(kind, folder, &file.filename);

        let put = self
            .store
            .put(&key, file.bytes, &content_type)
            .await
            .map_err(|e| AppError::UploadFailure(e.to_string()))?;

        let size = put.size;
        let url = self.store.url(&key);
        let detail = serde_json::to_value(&put)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        FileRepo::new(self.pool)
            .create(NewFile {
                filename: file.filename,
                url: url.clone(),
                download_url: url,
                public_id: key,
                kind,
                size,
                classes: extra.classes,
                category_id: extra.category_id,
                owner_id: extra.owner_id,
                owner_name: owner.map(|u| u.name),
                detail,
            })
            .await
    }

    /// Remove a file: the provider object first, then the row. A provider
    /// failure leaves the row in place so the deletion can be retried.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let repo = FileRepo::new(self.pool);
        let record = repo.get(id).await?;

        self.store
            .delete(&record.public_id)
            .await
            .map_err(|e| AppError::Internal(format!("provider delete failed: {}", e)))?;

        repo.delete(id).await
    }
}

/// Storage key for an upload. Raw files drop their extension so repeated
/// uploads of the same logical document overwrite in place; media files
/// keep it.
fn storage_key(kind: MediaKind, folder: &str, filename: &str) -> String {
    let name = sanitize_file_name(filename);
    let name = match kind {
        MediaKind::Raw => strip_extension(&name).to_string(),
        _ => name,
    };
    format!("mcollection/{}/{}", folder, name)
}
