use super::{check_key, join_url, BlobStore, Result, StorageError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    content_type: String,
}

/// In-memory blob store for tests and development nodes
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<String, StoredBlob>>,
    public_url: String,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://contents")
    }
}

impl MemoryBlobStore {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            blobs: Arc::new(DashMap::new()),
            public_url: public_url.into(),
        }
    }

    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.get(key).map(|blob| blob.data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.blobs.get(key).map(|blob| blob.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save_file(&self, key: &str, data: &[u8], content_type: &str) -> Result<String> {
        check_key(key)?;
        self.blobs.insert(
            key.to_string(),
            StoredBlob {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(self.get_file(key))
    }

    async fn file_size(&self, key: &str) -> Result<u64> {
        self.blobs
            .get(key)
            .map(|blob| blob.data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn read_file(&self, key: &str) -> Result<Vec<u8>> {
        self.get_bytes(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn get_file(&self, key: &str) -> String {
        join_url(&self.public_url, key)
    }
}
