//! Multipart upload → `UploadRequest`.
//!
//! The request is built once per HTTP call, consumed by the orchestrator and
//! dropped with the response.

use crate::error::{DeployError, Result};
use crate::types::{ContentMapping, Deploy, DeployProof, Parcel, SCENE_DESCRIPTOR};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};

pub const PROOF_PART: &str = "proof.json";
pub const DEPLOY_PART: &str = "deploy.json";
pub const MAPPINGS_PART: &str = "mappings.json";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One multipart field as received
#[derive(Debug, Clone, Default)]
pub struct RawPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl RawPart {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            ..Default::default()
        }
    }
}

/// File bytes submitted under their declared content identifier
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub cid: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub proof: DeployProof,
    pub deploy: Deploy,
    pub mappings: Vec<ContentMapping>,
    pub files: HashMap<String, UploadedFile>,
    pub parcels: Vec<Parcel>,
    pub origin: Option<String>,
    deploy_bytes: Vec<u8>,
    mappings_bytes: Vec<u8>,
}

impl UploadRequest {
    /// Split the multipart fields into the manifest entities and file parts,
    /// then check the required fields are present
    pub fn from_parts(parts: Vec<RawPart>, origin: Option<String>) -> Result<Self> {
        let mut proof_bytes = None;
        let mut deploy_bytes = None;
        let mut mappings_bytes = None;
        let mut files = HashMap::new();

        for part in parts {
            match part.name.as_str() {
                PROOF_PART => proof_bytes = Some(part.data),
                DEPLOY_PART => deploy_bytes = Some(part.data),
                MAPPINGS_PART => mappings_bytes = Some(part.data),
                "" => return Err(DeployError::required("file part without a content identifier")),
                name => {
                    if files.contains_key(name) {
                        warn!("Duplicate upload of {}, keeping the first", name);
                        continue;
                    }
                    debug!(
                        "Received {} ({} bytes, {})",
                        name,
                        part.data.len(),
                        part.file_name.as_deref().unwrap_or("unnamed")
                    );
                    files.insert(
                        name.to_string(),
                        UploadedFile {
                            cid: part.name.clone(),
                            content_type: part
                                .content_type
                                .filter(|ct| !ct.is_empty())
                                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                            data: part.data,
                        },
                    );
                }
            }
        }

        let proof_bytes = proof_bytes.ok_or_else(|| missing(PROOF_PART))?;
        let deploy_bytes = deploy_bytes.ok_or_else(|| missing(DEPLOY_PART))?;
        let mappings_bytes = mappings_bytes.ok_or_else(|| missing(MAPPINGS_PART))?;

        let proof: DeployProof = parse_json(PROOF_PART, &proof_bytes)?;
        let deploy: Deploy = parse_json(DEPLOY_PART, &deploy_bytes)?;
        let mappings: Vec<ContentMapping> = parse_json(MAPPINGS_PART, &mappings_bytes)?;

        validate_proof(&proof)?;
        validate_deploy(&deploy)?;
        if mappings.is_empty() {
            return Err(DeployError::required("content mappings are empty"));
        }
        if let Some(entry) = mappings.iter().find(|m| m.cid.is_empty() || m.name.is_empty()) {
            return Err(DeployError::required(format!(
                "content mapping with empty field: {:?}",
                entry
            )));
        }
        let parcels = unique_parcels(&deploy.positions)?;

        Ok(Self {
            proof,
            deploy,
            mappings,
            files,
            parcels,
            origin,
            deploy_bytes,
            mappings_bytes,
        })
    }

    /// Raw `deploy.json` bytes, as hashed into the proof id
    pub fn deploy_bytes(&self) -> &[u8] {
        &self.deploy_bytes
    }

    /// Raw `mappings.json` bytes, as hashed into the deploy's mappings hash
    pub fn mappings_bytes(&self) -> &[u8] {
        &self.mappings_bytes
    }

    /// Content identifier the deploy requires for the scene descriptor
    pub fn declared_root_hash(&self) -> Result<&str> {
        self.deploy
            .required
            .iter()
            .find(|m| m.is_scene_descriptor())
            .map(|m| m.cid.as_str())
            .ok_or_else(|| DeployError::invalid(format!("deploy does not require {}", SCENE_DESCRIPTOR)))
    }

    /// Every required mapping must appear verbatim in the manifest
    pub fn check_required_mappings(&self) -> Result<()> {
        for required in &self.deploy.required {
            if !self.mappings.contains(required) {
                return Err(DeployError::invalid(format!(
                    "required file {} ({}) is missing from the content mappings",
                    required.name, required.cid
                )));
            }
        }
        Ok(())
    }

    /// Manifest entries that carry bytes
    pub fn file_mappings(&self) -> impl Iterator<Item = &ContentMapping> {
        self.mappings.iter().filter(|m| !m.is_directory())
    }

    pub fn positions(&self) -> Vec<String> {
        self.parcels.iter().map(|p| p.to_string()).collect()
    }
}

fn missing(part: &str) -> DeployError {
    DeployError::required(format!("missing required part: {}", part))
}

fn parse_json<T: DeserializeOwned>(part: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| DeployError::invalid(format!("invalid {}: {}", part, e)))
}

fn validate_proof(proof: &DeployProof) -> Result<()> {
    if proof.signature.is_empty() {
        return Err(DeployError::required("proof signature is required"));
    }
    if proof.address.is_empty() {
        return Err(DeployError::required("proof address is required"));
    }
    if proof.id.is_empty() {
        return Err(DeployError::required("proof id is required"));
    }
    if proof.timestamp <= 0 {
        return Err(DeployError::required("proof timestamp is required"));
    }
    Ok(())
}

fn validate_deploy(deploy: &Deploy) -> Result<()> {
    if deploy.positions.is_empty() {
        return Err(DeployError::required("deploy positions are required"));
    }
    if deploy.mappings_hash.is_empty() {
        return Err(DeployError::required("deploy mappingsHash is required"));
    }
    if deploy.timestamp <= 0 {
        return Err(DeployError::required("deploy timestamp is required"));
    }
    Ok(())
}

/// Parse positions, rejecting malformed or repeated coordinates
fn unique_parcels(positions: &[String]) -> Result<Vec<Parcel>> {
    let mut seen = HashSet::new();
    let mut parcels = Vec::with_capacity(positions.len());
    for position in positions {
        let parcel: Parcel = position
            .parse()
            .map_err(|e: crate::types::ParcelParseError| DeployError::invalid(e.to_string()))?;
        if !seen.insert(parcel) {
            return Err(DeployError::invalid(format!("duplicate position: {}", parcel)));
        }
        parcels.push(parcel);
    }
    Ok(parcels)
}
