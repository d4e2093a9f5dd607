use super::{check_key, join_url, BlobStore, Result, StorageError};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use log::{debug, error};

/// Blob store backed by an S3 (or S3-compatible) bucket
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket_name: String,
    public_url: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket_name: impl Into<String>, public_url: impl Into<String>) -> Self {
        Self {
            client,
            bucket_name: bucket_name.into(),
            public_url: public_url.into(),
        }
    }

    /// Build a client from the ambient AWS configuration, optionally pointed
    /// at a custom endpoint (MinIO, localstack)
    pub async fn from_env(
        bucket_name: impl Into<String>,
        public_url: impl Into<String>,
        endpoint: Option<&str>,
    ) -> Self {
        let sdk_config = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()), bucket_name, public_url)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn save_file(&self, key: &str, data: &[u8], content_type: &str) -> Result<String> {
        check_key(key)?;
        debug!(
            "Writing to S3 bucket {} with key: {}, size: {} bytes",
            self.bucket_name,
            key,
            data.len()
        );

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!("S3 PUT failed - Bucket: {}, Key: {}, Error: {:?}", self.bucket_name, key, e);
                StorageError::Internal(format!("failed to write {} to S3: {}", key, e))
            })?;

        Ok(self.get_file(key))
    }

    async fn file_size(&self, key: &str) -> Result<u64> {
        check_key(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
        {
            Ok(output) => Ok(output.content_length().unwrap_or_default().max(0) as u64),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Err(StorageError::NotFound(key.to_string()))
                } else {
                    Err(StorageError::Internal(format!(
                        "failed to stat {} in S3: {}",
                        key, service_error
                    )))
                }
            }
        }
    }

    async fn read_file(&self, key: &str) -> Result<Vec<u8>> {
        check_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Internal(format!("failed to read {} from S3: {}", key, service_error))
                }
            })?;
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Internal(format!("failed to read body of {}: {}", key, e)))?;
        Ok(body.into_bytes().to_vec())
    }

    fn get_file(&self, key: &str) -> String {
        join_url(&self.public_url, key)
    }
}
