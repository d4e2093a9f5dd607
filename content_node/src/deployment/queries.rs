//! Read side over accepted deploys and stored blobs.

use crate::content::Cid;
use crate::error::{DeployError, Result};
use crate::storage::{BlobStore, MappingStore, StorageError};
use crate::types::{ContentMapping, DeployMetadata, Parcel};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Current content of one parcel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcelContent {
    pub parcel_id: String,
    pub root_cid: String,
    pub contents: Vec<ContentMapping>,
    pub publisher: String,
}

#[derive(Clone)]
pub struct ContentQueries {
    blob_store: Arc<dyn BlobStore>,
    mappings: Arc<dyn MappingStore>,
    max_mapping_parcels: usize,
}

impl ContentQueries {
    pub fn new(blob_store: Arc<dyn BlobStore>, mappings: Arc<dyn MappingStore>, max_mapping_parcels: usize) -> Self {
        Self {
            blob_store,
            mappings,
            max_mapping_parcels,
        }
    }

    /// Public locator of a stored blob, `None` when it was never stored
    pub async fn content_location(&self, cid: &str) -> Result<Option<String>> {
        cid.parse::<Cid>()
            .map_err(|e| DeployError::invalid(format!("invalid content id {}: {}", cid, e)))?;
        match self.blob_store.file_size(cid).await {
            Ok(_) => Ok(Some(self.blob_store.get_file(cid))),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(DeployError::from_storage(cid, e)),
        }
    }

    /// Bytes of a stored blob, `None` when it was never stored
    pub async fn content_bytes(&self, cid: &str) -> Result<Option<Vec<u8>>> {
        cid.parse::<Cid>()
            .map_err(|e| DeployError::invalid(format!("invalid content id {}: {}", cid, e)))?;
        match self.blob_store.read_file(cid).await {
            Ok(data) => Ok(Some(data)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(DeployError::from_storage(cid, e)),
        }
    }

    /// Presence of each blob. Malformed ids are reported absent.
    pub async fn asset_status(&self, cids: &[String]) -> Result<BTreeMap<String, bool>> {
        let mut status = BTreeMap::new();
        for cid in cids {
            let present = match self.blob_store.file_size(cid).await {
                Ok(_) => true,
                Err(StorageError::NotFound(_)) | Err(StorageError::InvalidKey(_)) => false,
                Err(e) => return Err(DeployError::from_storage(cid, e)),
            };
            status.insert(cid.clone(), present);
        }
        Ok(status)
    }

    /// Content of every parcel with a deploy inside the inclusive rectangle
    /// spanned by `nw` and `se`
    pub async fn parcel_contents(&self, nw: Parcel, se: Parcel) -> Result<Vec<ParcelContent>> {
        let (min_x, max_x) = (nw.x.min(se.x), nw.x.max(se.x));
        let (min_y, max_y) = (nw.y.min(se.y), nw.y.max(se.y));
        let count = (i64::from(max_x) - i64::from(min_x) + 1) * (i64::from(max_y) - i64::from(min_y) + 1);
        if count > self.max_mapping_parcels as i64 {
            return Err(DeployError::invalid(format!(
                "too many parcels requested: {} (max {})",
                count, self.max_mapping_parcels
            )));
        }

        let mut result = Vec::new();
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                let parcel = Parcel::new(x, y);
                let Some(id) = self.current_deploy(&parcel).await? else {
                    continue;
                };
                let contents = self
                    .mappings
                    .get_deploy_mappings(&id)
                    .await
                    .map_err(|e| DeployError::from_storage(&id, e))?
                    .unwrap_or_default();
                let publisher = self
                    .mappings
                    .get_deploy_metadata(&id)
                    .await
                    .map_err(|e| DeployError::from_storage(&id, e))?
                    .map(|metadata| metadata.proof.address)
                    .unwrap_or_default();
                result.push(ParcelContent {
                    parcel_id: parcel.to_string(),
                    root_cid: id,
                    contents,
                    publisher,
                });
            }
        }
        Ok(result)
    }

    /// Metadata of the deploy currently occupying `parcel`
    pub async fn parcel_metadata(&self, parcel: Parcel) -> Result<Option<DeployMetadata>> {
        let Some(id) = self.current_deploy(&parcel).await? else {
            return Ok(None);
        };
        self.mappings
            .get_deploy_metadata(&id)
            .await
            .map_err(|e| DeployError::from_storage(&id, e))
    }

    async fn current_deploy(&self, parcel: &Parcel) -> Result<Option<String>> {
        self.mappings
            .get_parcel_content(parcel)
            .await
            .map_err(|e| DeployError::from_storage(&parcel.to_string(), e))
    }
}
