use super::cid::{Cid, ContentHasher};
use crate::deployment::request::UploadedFile;
use crate::error::{DeployError, Result};
use crate::storage::BlobStore;
use crate::types::ContentMapping;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Checks every manifest entry against the bytes it claims to address.
///
/// Entries uploaded with the request are re-hashed; entries that were not
/// uploaded must already exist in the blob store. This lets a redeploy send
/// only the files that changed.
#[derive(Clone)]
pub struct ContentValidator {
    hasher: Arc<dyn ContentHasher>,
    store: Arc<dyn BlobStore>,
}

impl ContentValidator {
    pub fn new(hasher: Arc<dyn ContentHasher>, store: Arc<dyn BlobStore>) -> Self {
        Self { hasher, store }
    }

    pub async fn validate(
        &self,
        manifest: &[ContentMapping],
        uploaded: &HashMap<String, UploadedFile>,
        declared_root_hash: &str,
    ) -> Result<()> {
        let root: Cid = declared_root_hash
            .parse()
            .map_err(|e| DeployError::invalid(format!("invalid root content id {}: {}", declared_root_hash, e)))?;

        for entry in manifest.iter().filter(|m| !m.is_directory()) {
            let declared: Cid = entry
                .cid
                .parse()
                .map_err(|e| DeployError::invalid(format!("invalid content id for {}: {}", entry.name, e)))?;

            if entry.is_scene_descriptor() && declared != root {
                return Err(DeployError::invalid(format!(
                    "{} content id {} does not match the deploy's {}",
                    entry.name, entry.cid, declared_root_hash
                )));
            }

            match uploaded.get(&entry.cid) {
                Some(file) => {
                    let actual = self.hasher.calculate_hash(&file.data);
                    if (actual.version(), actual.codec()) != (declared.version(), declared.codec()) {
                        return Err(DeployError::invalid(format!(
                            "unsupported content id {} for file: {} (version {}, codec 0x{:x}; expected version {}, codec 0x{:x})",
                            entry.cid,
                            entry.name,
                            declared.version(),
                            declared.codec(),
                            actual.version(),
                            actual.codec()
                        )));
                    }
                    if actual != declared {
                        return Err(DeployError::invalid(format!(
                            "failed to validate content id for file: {} (declared {}, computed {})",
                            entry.name, entry.cid, actual
                        )));
                    }
                }
                None => {
                    // Not uploaded: must come from a previous deploy
                    self.store
                        .file_size(&entry.cid)
                        .await
                        .map_err(|e| DeployError::from_storage(&entry.name, e))?;
                    debug!("{} already stored as {}", entry.name, entry.cid);
                }
            }
        }

        Ok(())
    }
}
