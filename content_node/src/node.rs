//! Wires the configured collaborators into the application state.

use crate::api::AppState;
use crate::authorization::HttpLandRegistry;
use crate::config::{Config, StorageKind};
use crate::content::Sha256RawHasher;
use crate::crypto::{DisabledSmartAccountClient, JsonRpcSmartAccountClient, SmartAccountClient};
use crate::deployment::{Collaborators, ContentQueries, DeployLimits, DeploymentService};
use crate::metrics::DeployMetrics;
use crate::storage::{BlobStore, LocalBlobStore, MappingStore, MemoryBlobStore, MemoryMappingStore, S3BlobStore};
use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;

pub async fn blob_store_from_config(config: &Config) -> Result<Arc<dyn BlobStore>> {
    let storage = &config.storage;
    let store: Arc<dyn BlobStore> = match storage.kind {
        StorageKind::Memory => {
            warn!("Using in-memory blob storage, contents are lost on restart");
            Arc::new(MemoryBlobStore::new(storage.public_url.clone()))
        }
        StorageKind::Local => {
            tokio::fs::create_dir_all(&storage.local_dir)
                .await
                .with_context(|| format!("creating {}", storage.local_dir.display()))?;
            info!("Storing contents in {}", storage.local_dir.display());
            Arc::new(LocalBlobStore::new(storage.local_dir.clone(), storage.public_url.clone()))
        }
        StorageKind::S3 => {
            info!("Storing contents in S3 bucket {}", storage.s3_bucket);
            Arc::new(
                S3BlobStore::from_env(
                    storage.s3_bucket.clone(),
                    storage.public_url.clone(),
                    storage.s3_endpoint.as_deref(),
                )
                .await,
            )
        }
    };
    Ok(store)
}

pub fn smart_accounts_from_config(config: &Config) -> Result<Arc<dyn SmartAccountClient>> {
    match &config.ethereum.rpc_url {
        Some(rpc_url) => {
            info!("Smart-account signatures checked via {}", rpc_url);
            let client = JsonRpcSmartAccountClient::new(rpc_url.clone(), config.ethereum.timeout())
                .context("building JSON-RPC client")?;
            Ok(Arc::new(client))
        }
        None => {
            warn!("No ethereum.rpc_url configured, smart-account signatures will be rejected");
            Ok(Arc::new(DisabledSmartAccountClient))
        }
    }
}

/// Assemble the application state from configuration
pub async fn build_state(config: &Config) -> Result<AppState> {
    let blob_store = blob_store_from_config(config).await?;
    let mappings: Arc<dyn MappingStore> = Arc::new(MemoryMappingStore::new());
    let land_registry = HttpLandRegistry::new(config.land_registry.url.clone(), config.land_registry.timeout())
        .context("building land registry client")?;

    let collaborators = Collaborators {
        land_registry: Arc::new(land_registry),
        smart_accounts: smart_accounts_from_config(config)?,
        hasher: Arc::new(Sha256RawHasher),
        blob_store: blob_store.clone(),
        mappings: mappings.clone(),
    };
    Ok(state_from_collaborators(collaborators, config))
}

pub fn state_from_collaborators(collaborators: Collaborators, config: &Config) -> AppState {
    let limits = DeployLimits {
        parcel_size_limit: config.limits.parcel_size_limit,
        request_ttl_seconds: config.limits.request_ttl_seconds,
    };
    let metrics = DeployMetrics::new();
    let queries = ContentQueries::new(
        collaborators.blob_store.clone(),
        collaborators.mappings.clone(),
        config.limits.max_mapping_parcels,
    );

    AppState {
        deployments: Arc::new(DeploymentService::new(collaborators, limits, metrics.clone())),
        queries,
        metrics,
        metrics_enabled: config.metrics.enabled,
        max_upload_bytes: config.limits.max_upload_bytes,
    }
}
