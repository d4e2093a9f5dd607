//! Parcel → deploy mappings.
//!
//! Keys are independent: there is no transaction spanning a parcel and the
//! deploy it points at, and concurrent deploys to one parcel resolve
//! last-writer-wins.

use super::Result;
use crate::types::{ContentMapping, DeployMetadata, Parcel};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Point `parcel` at the deploy identified by `content_id`
    async fn set_parcel_content(&self, parcel: &Parcel, content_id: &str) -> Result<()>;

    async fn get_parcel_content(&self, parcel: &Parcel) -> Result<Option<String>>;

    async fn set_deploy_mappings(&self, content_id: &str, mappings: &[ContentMapping]) -> Result<()>;

    async fn get_deploy_mappings(&self, content_id: &str) -> Result<Option<Vec<ContentMapping>>>;

    async fn set_deploy_metadata(&self, content_id: &str, metadata: &DeployMetadata) -> Result<()>;

    async fn get_deploy_metadata(&self, content_id: &str) -> Result<Option<DeployMetadata>>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryMappingStore {
    parcels: Arc<DashMap<Parcel, String>>,
    mappings: Arc<DashMap<String, Vec<ContentMapping>>>,
    metadata: Arc<DashMap<String, DeployMetadata>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn set_parcel_content(&self, parcel: &Parcel, content_id: &str) -> Result<()> {
        self.parcels.insert(*parcel, content_id.to_string());
        Ok(())
    }

    async fn get_parcel_content(&self, parcel: &Parcel) -> Result<Option<String>> {
        Ok(self.parcels.get(parcel).map(|id| id.clone()))
    }

    async fn set_deploy_mappings(&self, content_id: &str, mappings: &[ContentMapping]) -> Result<()> {
        self.mappings.insert(content_id.to_string(), mappings.to_vec());
        Ok(())
    }

    async fn get_deploy_mappings(&self, content_id: &str) -> Result<Option<Vec<ContentMapping>>> {
        Ok(self.mappings.get(content_id).map(|m| m.clone()))
    }

    async fn set_deploy_metadata(&self, content_id: &str, metadata: &DeployMetadata) -> Result<()> {
        self.metadata.insert(content_id.to_string(), metadata.clone());
        Ok(())
    }

    async fn get_deploy_metadata(&self, content_id: &str) -> Result<Option<DeployMetadata>> {
        Ok(self.metadata.get(content_id).map(|m| m.clone()))
    }
}
