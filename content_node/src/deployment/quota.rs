//! Size budget and freshness checks.

use super::request::UploadRequest;
use crate::error::{DeployError, Result};
use crate::storage::BlobStore;
use std::sync::Arc;

/// Whether a signed `timestamp` (Unix seconds) is still within `ttl_seconds`
/// of the current wall-clock time. `now` is sampled on every call, so this is
/// a best-effort window rather than replay protection.
pub fn check_freshness(timestamp: i64, ttl_seconds: i64) -> bool {
    is_fresh_at(timestamp, ttl_seconds, chrono::Utc::now().timestamp())
}

pub fn is_fresh_at(timestamp: i64, ttl_seconds: i64, now: i64) -> bool {
    now.saturating_sub(timestamp) <= ttl_seconds
}

/// Enforces the per-parcel byte budget
#[derive(Clone)]
pub struct QuotaGuard {
    parcel_size_limit: u64,
    store: Arc<dyn BlobStore>,
}

impl QuotaGuard {
    pub fn new(parcel_size_limit: u64, store: Arc<dyn BlobStore>) -> Self {
        Self {
            parcel_size_limit,
            store,
        }
    }

    pub fn max_size(&self, parcels: usize) -> u64 {
        self.parcel_size_limit.saturating_mul(parcels as u64)
    }

    /// Returns the total deploy size when it fits the budget of its parcels
    pub async fn check_size(&self, request: &UploadRequest) -> Result<u64> {
        let max = self.max_size(request.parcels.len());
        let mut actual: u64 = 0;

        for entry in request.file_mappings() {
            let size = match request.files.get(&entry.cid) {
                Some(file) => file.data.len() as u64,
                None => self
                    .store
                    .file_size(&entry.cid)
                    .await
                    .map_err(|e| DeployError::from_storage(&entry.name, e))?,
            };
            actual = actual.saturating_add(size);
        }

        if actual > max {
            return Err(DeployError::invalid(format!(
                "deploy size exceeds the allowed limit: max allowed {} bytes, actual {} bytes",
                max, actual
            )));
        }
        Ok(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::request::{RawPart, DEPLOY_PART, MAPPINGS_PART, PROOF_PART};
    use crate::storage::MemoryBlobStore;

    fn request(positions: &str, mappings: &str, files: Vec<RawPart>) -> UploadRequest {
        let mut parts = vec![
            RawPart::new(PROOF_PART, r#"{"signature":"0x1","address":"0x2","id":"b3","timestamp":1}"#),
            RawPart::new(
                DEPLOY_PART,
                format!(r#"{{"positions":{},"mappingsHash":"b4","timestamp":1}}"#, positions),
            ),
            RawPart::new(MAPPINGS_PART, mappings.to_string()),
        ];
        parts.extend(files);
        UploadRequest::from_parts(parts, None).unwrap()
    }

    #[test]
    fn test_freshness_window() {
        assert!(is_fresh_at(1_000, 600, 1_600));
        assert!(!is_fresh_at(1_000, 600, 1_601));
        // future timestamps are not expired
        assert!(is_fresh_at(2_000, 600, 1_000));
        assert!(check_freshness(chrono::Utc::now().timestamp(), 60));
        assert!(!check_freshness(chrono::Utc::now().timestamp() - 120, 60));
    }

    #[tokio::test]
    async fn test_exactly_at_limit_passes() {
        let guard = QuotaGuard::new(5, Arc::new(MemoryBlobStore::default()));
        let req = request(
            r#"["0,0","0,1"]"#,
            r#"[{"cid":"a","name":"a.bin"},{"cid":"b","name":"b.bin"},{"cid":"d","name":"dir/"}]"#,
            vec![RawPart::new("a", vec![0u8; 6]), RawPart::new("b", vec![0u8; 4])],
        );
        assert_eq!(guard.check_size(&req).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_over_limit_reports_both_values() {
        let guard = QuotaGuard::new(5, Arc::new(MemoryBlobStore::default()));
        let req = request(
            r#"["0,0"]"#,
            r#"[{"cid":"a","name":"a.bin"}]"#,
            vec![RawPart::new("a", vec![0u8; 6])],
        );
        let err = guard.check_size(&req).await.unwrap_err();
        assert!(matches!(err, DeployError::InvalidArgument(m) if m.contains("5") && m.contains("6")));
    }

    #[tokio::test]
    async fn test_stored_files_count_towards_size() {
        let store = Arc::new(MemoryBlobStore::default());
        store.save_file("stored", &[0u8; 7], "application/octet-stream").await.unwrap();
        let guard = QuotaGuard::new(10, store);
        let req = request(
            r#"["0,0"]"#,
            r#"[{"cid":"a","name":"a.bin"},{"cid":"stored","name":"old.bin"}]"#,
            vec![RawPart::new("a", vec![0u8; 3])],
        );
        assert_eq!(guard.check_size(&req).await.unwrap(), 10);

        let req = request(r#"["0,0"]"#, r#"[{"cid":"gone","name":"gone.bin"}]"#, vec![]);
        let err = guard.check_size(&req).await.unwrap_err();
        assert!(matches!(err, DeployError::InvalidArgument(m) if m == "file: gone.bin not found"));
    }
}
