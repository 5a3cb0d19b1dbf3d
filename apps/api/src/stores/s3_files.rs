use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use tracing::debug;

use super::{FileStore, StoreError};
use crate::payload::OpaquePayload;

/// File store backed by one S3 (or MinIO) bucket; paths are object keys.
#[derive(Clone)]
pub struct S3FileStore {
    client: S3Client,
    bucket: String,
}

impl S3FileStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn read(&self, path: &str) -> Result<Option<OpaquePayload>> {
        let key = path.trim_start_matches('/');
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    debug!("s3://{}/{} does not exist", self.bucket, key);
                    return Ok(None);
                }
                return Err(StoreError::File {
                    path: path.to_string(),
                    message: e.to_string(),
                }
                .into());
            }
        };

        let content_type = output.content_type().map(str::to_string);
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::File {
                path: path.to_string(),
                message: format!("body read failed: {e}"),
            })?
            .into_bytes();

        debug!(
            "Read s3://{}/{} ({} bytes, content type {:?})",
            self.bucket,
            key,
            body.len(),
            content_type
        );
        Ok(Some(OpaquePayload::from_stored(
            content_type.as_deref(),
            body,
        )))
    }
}
