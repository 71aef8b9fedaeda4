//! S3-compatible object storage client
//!
//! Thin wrapper over the AWS SDK: put, delete, and public URL construction.
//! Keys are written with overwrite semantics; callers that need uniqueness
//! must encode it into the key.

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 connection failed: {0}")]
    ConnectionFailed(String),

    #[error("S3 SDK error: {0}")]
    SdkError(String),
}

/// Result of a successful upload, echoed into the file entity's opaque
/// provider metadata.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PutResult {
    pub bucket: String,
    pub key: String,
    pub etag: Option<String>,
    pub content_type: String,
    pub size: i64,
}

#[derive(Clone)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
    bucket: String,
    endpoint: String,
}

impl S3Client {
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "mcollection",
        );

        let region = Region::new(
            config
                .region
                .clone()
                .unwrap_or_else(|| "us-east-1".to_string()),
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            // MinIO and most S3-compatible stores need path-style addressing.
            .force_path_style(true)
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Upload bytes under `key`, replacing any existing object.
    pub async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<PutResult, StorageError> {
        let size = data.len() as i64;
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::SdkError(e.to_string()))?;

        Ok(PutResult {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            etag: output.e_tag().map(str::to_string),
            content_type: content_type.to_string(),
            size,
        })
    }

    pub async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::SdkError(e.to_string()))?;
        Ok(())
    }

    /// Public URL for an object, path-style against the configured endpoint.
    pub fn object_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}/{}", self.endpoint, self.bucket, encoded.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::config::StorageProvider;

    async fn client() -> S3Client {
        S3Client::new(&StorageConfig {
            provider: StorageProvider::Minio,
            endpoint: "http://localhost:9000/".to_string(),
            bucket: "mcollection".to_string(),
            access_key: "test".to_string(),
            secret_key: "test".to_string(),
            region: None,
        })
        .await
        .expect("client config")
    }

    #[tokio::test]
    async fn test_object_url_encodes_segments() {
        let client = client().await;
        assert_eq!(
            client.object_url("mcollection/general/bai tap.pdf"),
            "http://localhost:9000/mcollection/mcollection/general/bai%20tap.pdf"
        );
    }

    #[tokio::test]
    async fn test_object_url_preserves_separators() {
        let client = client().await;
        let url = client.object_url("a/b/c.png");
        assert!(url.ends_with("/mcollection/a/b/c.png"));
    }
}
