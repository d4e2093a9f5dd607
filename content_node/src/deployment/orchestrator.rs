//! Deploy pipeline.
//!
//! `Parsed → SignatureOK → AuthorizationOK → NotExpired → SizeOK →
//! ContentAddressOK → Persisted`, terminal on the first failure. Nothing is
//! written before every check has passed; a failure part-way through
//! persistence is not rolled back, since re-running it writes the same bytes
//! under the same keys.

use super::quota::{check_freshness, QuotaGuard};
use super::request::UploadRequest;
use crate::authorization::{AuthorizationService, LandRegistry};
use crate::content::{Cid, ContentHasher, ContentValidator};
use crate::crypto::{SignatureVerifier, SmartAccountClient};
use crate::error::{DeployError, Result};
use crate::metrics::DeployMetrics;
use crate::storage::{BlobStore, MappingStore};
use crate::types::{DeployMetadata, Parcel};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Policy knobs for the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployLimits {
    /// Byte budget granted per parcel
    pub parcel_size_limit: u64,
    /// Maximum age of signed timestamps, in seconds
    pub request_ttl_seconds: i64,
}

impl Default for DeployLimits {
    fn default() -> Self {
        Self {
            parcel_size_limit: 15 * 1024 * 1024,
            request_ttl_seconds: 600,
        }
    }
}

/// External collaborators the pipeline is wired with
#[derive(Clone)]
pub struct Collaborators {
    pub land_registry: Arc<dyn LandRegistry>,
    pub smart_accounts: Arc<dyn SmartAccountClient>,
    pub hasher: Arc<dyn ContentHasher>,
    pub blob_store: Arc<dyn BlobStore>,
    pub mappings: Arc<dyn MappingStore>,
}

/// Outcome of an accepted deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReceipt {
    pub id: String,
    pub files_stored: usize,
    pub bytes_stored: u64,
    pub parcels: Vec<String>,
}

#[derive(Clone)]
pub struct DeploymentService {
    verifier: SignatureVerifier,
    authorization: AuthorizationService,
    quota: QuotaGuard,
    validator: ContentValidator,
    hasher: Arc<dyn ContentHasher>,
    blob_store: Arc<dyn BlobStore>,
    mappings: Arc<dyn MappingStore>,
    metrics: DeployMetrics,
    limits: DeployLimits,
}

impl DeploymentService {
    pub fn new(collaborators: Collaborators, limits: DeployLimits, metrics: DeployMetrics) -> Self {
        let Collaborators {
            land_registry,
            smart_accounts,
            hasher,
            blob_store,
            mappings,
        } = collaborators;

        Self {
            verifier: SignatureVerifier::new(smart_accounts),
            authorization: AuthorizationService::new(land_registry),
            quota: QuotaGuard::new(limits.parcel_size_limit, blob_store.clone()),
            validator: ContentValidator::new(hasher.clone(), blob_store.clone()),
            hasher,
            blob_store,
            mappings,
            metrics,
            limits,
        }
    }

    pub fn metrics(&self) -> &DeployMetrics {
        &self.metrics
    }

    pub fn limits(&self) -> DeployLimits {
        self.limits
    }

    /// Validate and persist one upload
    pub async fn deploy(&self, request: UploadRequest) -> Result<DeployReceipt> {
        let started = Instant::now();
        let id = request.proof.id.clone();
        let origin = request.origin.clone().unwrap_or_else(|| "unknown origin".to_string());
        let result = self.run(request).await;
        self.metrics.record_stage("total", started.elapsed());

        match &result {
            Ok(receipt) => {
                self.metrics.record_outcome("success");
                info!(
                    "Deployed {} to {:?} from {}: {} new files, {} bytes",
                    receipt.id, receipt.parcels, origin, receipt.files_stored, receipt.bytes_stored
                );
            }
            Err(DeployError::Unexpected(e)) => {
                self.metrics.record_outcome("error");
                error!("Deploy {} from {} failed: {:#}", id, origin, e);
            }
            Err(e) => {
                self.metrics.record_outcome(e.kind());
                info!("Deploy {} from {} rejected: {}", id, origin, e);
            }
        }
        result
    }

    async fn run(&self, request: UploadRequest) -> Result<DeployReceipt> {
        let stage = Instant::now();
        self.check_integrity(&request)?;
        self.metrics.record_stage("parse", stage.elapsed());

        let stage = Instant::now();
        let proof = &request.proof;
        let valid = self
            .verifier
            .verify(&proof.signed_message(), &proof.signature, &proof.address)
            .await?;
        if !valid {
            return Err(DeployError::invalid("Signature is invalid"));
        }
        self.metrics.record_stage("signature", stage.elapsed());
        debug!("Signature OK for {}", proof.id);

        let stage = Instant::now();
        let authorized = self
            .authorization
            .user_can_modify_parcels(&proof.address, &request.positions())
            .await?;
        if !authorized {
            return Err(DeployError::Unauthorized(format!(
                "Address {} is not authorized to deploy to the requested parcels",
                proof.address
            )));
        }
        self.metrics.record_stage("authorization", stage.elapsed());
        debug!("Authorization OK for {}", proof.id);

        if !check_freshness(proof.timestamp, self.limits.request_ttl_seconds) {
            return Err(DeployError::invalid("Proof has expired"));
        }
        if !check_freshness(request.deploy.timestamp, self.limits.request_ttl_seconds) {
            return Err(DeployError::invalid("Deploy has expired"));
        }

        let stage = Instant::now();
        let total_size = self.quota.check_size(&request).await?;
        self.metrics.record_stage("size", stage.elapsed());
        debug!("Size OK for {}: {} bytes", proof.id, total_size);

        let stage = Instant::now();
        self.validator
            .validate(&request.mappings, &request.files, request.declared_root_hash()?)
            .await?;
        self.metrics.record_stage("content", stage.elapsed());
        debug!("Content addresses OK for {}", proof.id);

        let stage = Instant::now();
        let receipt = self.persist(&request).await?;
        self.metrics.record_stage("persist", stage.elapsed());
        Ok(receipt)
    }

    /// The proof id must address the submitted deploy, and the deploy must
    /// address the submitted manifest
    fn check_integrity(&self, request: &UploadRequest) -> Result<()> {
        let deploy_cid = self.hasher.calculate_hash(request.deploy_bytes());
        if !same_cid(&request.proof.id, &deploy_cid) {
            return Err(DeployError::invalid(format!(
                "proof id {} does not match deploy content id {}",
                request.proof.id, deploy_cid
            )));
        }

        let mappings_cid = self.hasher.calculate_hash(request.mappings_bytes());
        if !same_cid(&request.deploy.mappings_hash, &mappings_cid) {
            return Err(DeployError::invalid(format!(
                "mappingsHash {} does not match content mappings id {}",
                request.deploy.mappings_hash, mappings_cid
            )));
        }

        request.check_required_mappings()?;
        request.declared_root_hash()?;
        Ok(())
    }

    async fn persist(&self, request: &UploadRequest) -> Result<DeployReceipt> {
        let id = &request.proof.id;
        let mut saved = HashSet::new();
        let mut bytes_stored = 0u64;

        for entry in request.file_mappings() {
            let Some(file) = request.files.get(&entry.cid) else {
                continue;
            };
            if !saved.insert(entry.cid.as_str()) {
                continue;
            }
            let location = self
                .blob_store
                .save_file(&file.cid, &file.data, &file.content_type)
                .await
                .map_err(|e| DeployError::Unexpected(anyhow::Error::new(e).context(format!("saving {}", entry.name))))?;
            debug!("Stored {} at {}", entry.name, location);
            self.metrics.record_file_stored(file.data.len());
            bytes_stored += file.data.len() as u64;
        }

        for cid in request.files.keys().filter(|cid| !saved.contains(cid.as_str())) {
            if !request.mappings.iter().any(|m| &m.cid == cid) {
                warn!("Ignoring upload {} not referenced by the content mappings of {}", cid, id);
            }
        }

        // Deploy records go in before parcels point at them
        self.mappings
            .set_deploy_mappings(id, &request.mappings)
            .await
            .map_err(|e| storage_failure(e, "recording content mappings"))?;
        let metadata = DeployMetadata {
            proof: request.proof.clone(),
            positions: request.positions(),
            deployed_at: chrono::Utc::now().timestamp(),
        };
        self.mappings
            .set_deploy_metadata(id, &metadata)
            .await
            .map_err(|e| storage_failure(e, "recording deploy metadata"))?;

        for parcel in &request.parcels {
            self.mappings
                .set_parcel_content(parcel, id)
                .await
                .map_err(|e| storage_failure(e, &format!("mapping parcel {}", parcel)))?;
        }

        Ok(DeployReceipt {
            id: id.clone(),
            files_stored: saved.len(),
            bytes_stored,
            parcels: request.parcels.iter().map(Parcel::to_string).collect(),
        })
    }
}

fn same_cid(declared: &str, actual: &Cid) -> bool {
    declared.parse::<Cid>().map(|cid| &cid == actual).unwrap_or(false)
}

fn storage_failure(err: crate::storage::StorageError, action: &str) -> DeployError {
    DeployError::Unexpected(anyhow::Error::new(err).context(action.to_string()))
}
