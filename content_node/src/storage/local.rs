use super::{check_key, join_url, BlobStore, Result, StorageError};
use async_trait::async_trait;
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Blob store backed by a flat directory on local disk
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save_file(&self, key: &str, data: &[u8], _content_type: &str) -> Result<String> {
        check_key(key)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Internal(format!("create {:?}: {}", self.root, e)))?;

        // Write then rename so readers never observe a partial blob
        let path = self.blob_path(key);
        let tmp = self.root.join(format!(".{}.partial", key));
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| StorageError::Internal(format!("write {:?}: {}", tmp, e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::Internal(format!("rename {:?}: {}", path, e)))?;

        debug!("Stored {} ({} bytes) at {:?}", key, data.len(), path);
        Ok(self.get_file(key))
    }

    async fn file_size(&self, key: &str) -> Result<u64> {
        check_key(key)?;
        match tokio::fs::metadata(self.blob_path(key)).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::Internal(format!("stat {}: {}", key, e))),
        }
    }

    async fn read_file(&self, key: &str) -> Result<Vec<u8>> {
        check_key(key)?;
        match tokio::fs::read(self.blob_path(key)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::Internal(format!("read {}: {}", key, e))),
        }
    }

    fn get_file(&self, key: &str) -> String {
        join_url(&self.public_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("blobs"), "http://localhost:8000/contents");

        let location = store.save_file("bafkreiabc", b"hello world", "text/plain").await.unwrap();
        assert_eq!(location, "http://localhost:8000/contents/bafkreiabc");
        assert_eq!(store.file_size("bafkreiabc").await.unwrap(), 11);

        let on_disk = std::fs::read(dir.path().join("blobs").join("bafkreiabc")).unwrap();
        assert_eq!(on_disk, b"hello world");
        assert_eq!(store.read_file("bafkreiabc").await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_local_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost");
        assert!(store.file_size("bafkreimissing").await.unwrap_err().is_not_found());
        assert!(store.read_file("bafkreimissing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_local_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost");
        let err = store.save_file("../escape", b"x", "text/plain").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
