//! Blob and mapping storage collaborators.
//!
//! Blobs are keyed by content identifier, so writes are idempotent: the same
//! bytes always land under the same key.

use async_trait::async_trait;
use thiserror::Error;

pub mod local;
pub mod mappings;
pub mod memory;
pub mod s3;

pub use local::LocalBlobStore;
pub use mappings::{MappingStore, MemoryMappingStore};
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

// Storage-specific Result type
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The key was never stored
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Storage error: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Content-addressed blob storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, returning its public location
    async fn save_file(&self, key: &str, data: &[u8], content_type: &str) -> Result<String>;

    /// Size in bytes of the blob stored under `key`
    async fn file_size(&self, key: &str) -> Result<u64>;

    /// Full contents of the blob stored under `key`
    async fn read_file(&self, key: &str) -> Result<Vec<u8>>;

    /// Public locator for `key`; does not check existence
    fn get_file(&self, key: &str) -> String;
}

/// Reject keys that could escape a flat key space
pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}
