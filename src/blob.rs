//! S3-backed blob store for captured heap profiles.

use crate::core::{BlobStore, UploadError};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;

/// Uploads artifacts with their base filename as the object key. Credentials
/// and region come from the standard AWS environment/instance chain.
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&config),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, bucket: &str, path: &Path) -> Result<String, UploadError> {
        let key = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| UploadError::InvalidKey(path.to_path_buf()))?
            .to_string();

        let body = ByteStream::from_path(path)
            .await
            .map_err(|source| UploadError::Read {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|source| UploadError::Transport {
                bucket: bucket.to_string(),
                key: key.clone(),
                source: Box::new(source),
            })?;

        Ok(format!("https://{bucket}.s3.amazonaws.com/{key}"))
    }
}
