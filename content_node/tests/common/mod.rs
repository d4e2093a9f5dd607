//! Shared fixtures: a signed scene upload and fake collaborators.
#![allow(dead_code)]

use async_trait::async_trait;
use content_node::authorization::{AccessData, AuthorizationError, LandRegistry};
use content_node::content::{ContentHasher, Sha256RawHasher};
use content_node::crypto::{
    address_of, sign_message, DisabledSmartAccountClient, SignatureError, SmartAccountClient,
    ERC1654_MAGIC_VALUE,
};
use content_node::deployment::{
    Collaborators, DeployLimits, DeploymentService, RawPart, UploadRequest,
};
use content_node::metrics::DeployMetrics;
use content_node::storage::{MemoryBlobStore, MemoryMappingStore};
use content_node::types::{ContentMapping, Deploy, DeployProof};
use dashmap::DashSet;
use k256::ecdsa::SigningKey;
use std::sync::Arc;

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32].into()).unwrap()
}

pub fn cid_of(data: &[u8]) -> String {
    Sha256RawHasher.calculate_hash(data).to_string()
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Land registry granting access to an explicit set of (address, parcel)
#[derive(Default)]
pub struct FakeRegistry {
    grants: DashSet<(String, i32, i32)>,
}

impl FakeRegistry {
    pub fn grant(&self, address: &str, x: i32, y: i32) {
        self.grants.insert((address.to_lowercase(), x, y));
    }
}

#[async_trait]
impl LandRegistry for FakeRegistry {
    async fn get_parcel_access_data(
        &self,
        address: &str,
        x: i32,
        y: i32,
    ) -> Result<AccessData, AuthorizationError> {
        Ok(AccessData {
            address: address.to_string(),
            x,
            y,
            has_access: self.grants.contains(&(address.to_lowercase(), x, y)),
        })
    }
}

/// Smart account at `account` that accepts a single signature blob
pub struct FakeSmartAccount {
    pub account: String,
    pub accepted: Vec<u8>,
}

#[async_trait]
impl SmartAccountClient for FakeSmartAccount {
    async fn call_is_valid_signature(
        &self,
        address: &str,
        _hash: [u8; 32],
        signature: &[u8],
    ) -> Result<[u8; 4], SignatureError> {
        if address.eq_ignore_ascii_case(&self.account) && signature == self.accepted.as_slice() {
            Ok(ERC1654_MAGIC_VALUE)
        } else {
            Ok([0; 4])
        }
    }
}

/// A signed deploy of a small scene
#[derive(Clone)]
pub struct SceneUpload {
    pub key: SigningKey,
    pub files: Vec<(String, Vec<u8>)>,
    /// Manifest entries without file bytes behind them
    pub extra_mappings: Vec<ContentMapping>,
    pub positions: Vec<String>,
    /// Proof timestamp
    pub timestamp: i64,
    pub deploy_timestamp: i64,
}

impl SceneUpload {
    pub fn new(seed: u8) -> Self {
        Self {
            key: signing_key(seed),
            files: vec![
                (
                    "scene.json".to_string(),
                    br#"{"display":{"title":"Plaza"},"main":"bin/game.js"}"#.to_vec(),
                ),
                ("bin/game.js".to_string(), b"console.log('plaza')".to_vec()),
                ("models/tree.glb".to_string(), vec![7u8; 512]),
            ],
            extra_mappings: Vec::new(),
            positions: vec!["0,0".to_string(), "0,1".to_string()],
            timestamp: now(),
            deploy_timestamp: now(),
        }
    }

    pub fn with_file(mut self, name: &str, data: &[u8]) -> Self {
        self.files.retain(|(n, _)| n != name);
        self.files.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn with_positions(mut self, positions: &[&str]) -> Self {
        self.positions = positions.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Sets both the proof and the deploy timestamp
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self.deploy_timestamp = timestamp;
        self
    }

    pub fn with_proof_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_deploy_timestamp(mut self, timestamp: i64) -> Self {
        self.deploy_timestamp = timestamp;
        self
    }

    pub fn with_mapping(mut self, cid: &str, name: &str) -> Self {
        self.extra_mappings.push(ContentMapping::new(cid, name));
        self
    }

    pub fn address(&self) -> String {
        address_of(self.key.verifying_key())
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|(_, data)| data.len() as u64).sum()
    }

    pub fn cid(&self, name: &str) -> String {
        let (_, data) = self.files.iter().find(|(n, _)| n == name).unwrap();
        cid_of(data)
    }

    pub fn mappings(&self) -> Vec<ContentMapping> {
        let mut mappings = vec![ContentMapping::new("bafkreidirectory", "models/")];
        mappings.extend(
            self.files
                .iter()
                .map(|(name, data)| ContentMapping::new(cid_of(data), name.clone())),
        );
        mappings.extend(self.extra_mappings.iter().cloned());
        mappings
    }

    /// Deploy id, i.e. the content id of `deploy.json`
    pub fn deploy_id(&self) -> String {
        let (_, deploy_bytes, _) = self.manifest();
        cid_of(&deploy_bytes)
    }

    fn manifest(&self) -> (Vec<u8>, Vec<u8>, Deploy) {
        let mappings_bytes = serde_json::to_vec(&self.mappings()).unwrap();
        let deploy = Deploy {
            required: vec![ContentMapping::new(self.cid("scene.json"), "scene.json")],
            positions: self.positions.clone(),
            mappings_hash: cid_of(&mappings_bytes),
            timestamp: self.deploy_timestamp,
        };
        let deploy_bytes = serde_json::to_vec(&deploy).unwrap();
        (mappings_bytes, deploy_bytes, deploy)
    }

    /// Proof carrying an opaque smart-account signature for `account`
    pub fn proof_from_account(&self, account: &str, signature: &[u8]) -> DeployProof {
        DeployProof {
            signature: format!("0x{}", hex::encode(signature)),
            address: account.to_string(),
            id: self.deploy_id(),
            timestamp: self.timestamp,
        }
    }

    pub fn proof_signed_by(&self, key: &SigningKey) -> DeployProof {
        let id = self.deploy_id();
        let message = format!("{}.{}", id, self.timestamp);
        DeployProof {
            signature: sign_message(key, &message).unwrap(),
            address: self.address(),
            id,
            timestamp: self.timestamp,
        }
    }

    /// Multipart parts uploading the files whose names pass `upload`
    pub fn parts_with(&self, proof: &DeployProof, upload: impl Fn(&str) -> bool) -> Vec<RawPart> {
        let (mappings_bytes, deploy_bytes, _) = self.manifest();
        let mut parts = vec![
            RawPart::new("proof.json", serde_json::to_vec(proof).unwrap()),
            RawPart::new("deploy.json", deploy_bytes),
            RawPart::new("mappings.json", mappings_bytes),
        ];
        for (name, data) in self.files.iter().filter(|(name, _)| upload(name)) {
            let mut part = RawPart::new(cid_of(data), data.clone());
            part.file_name = Some(name.clone());
            parts.push(part);
        }
        parts
    }

    pub fn parts(&self) -> Vec<RawPart> {
        self.parts_with(&self.proof_signed_by(&self.key), |_| true)
    }

    pub fn request(&self) -> UploadRequest {
        UploadRequest::from_parts(self.parts(), None).unwrap()
    }
}

pub struct Harness {
    pub service: DeploymentService,
    pub registry: Arc<FakeRegistry>,
    pub blobs: Arc<MemoryBlobStore>,
    pub mappings: Arc<MemoryMappingStore>,
    pub metrics: DeployMetrics,
}

impl Harness {
    pub fn new(limits: DeployLimits) -> Self {
        Self::with_smart_accounts(limits, Arc::new(DisabledSmartAccountClient))
    }

    pub fn with_smart_accounts(limits: DeployLimits, smart_accounts: Arc<dyn SmartAccountClient>) -> Self {
        let registry = Arc::new(FakeRegistry::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let mappings = Arc::new(MemoryMappingStore::new());
        let metrics = DeployMetrics::new();
        let mut wiring = collaborators(&registry, &blobs, &mappings);
        wiring.smart_accounts = smart_accounts;
        let service = DeploymentService::new(wiring, limits, metrics.clone());
        Self {
            service,
            registry,
            blobs,
            mappings,
            metrics,
        }
    }

    /// Grant `upload`'s signer every parcel it deploys to
    pub fn grant_all(&self, upload: &SceneUpload) {
        self.grant_all_to(&upload.address(), upload);
    }

    pub fn grant_all_to(&self, address: &str, upload: &SceneUpload) {
        for position in &upload.positions {
            let (x, y) = position.split_once(',').unwrap();
            self.registry
                .grant(address, x.trim().parse().unwrap(), y.trim().parse().unwrap());
        }
    }
}

pub fn collaborators(
    registry: &Arc<FakeRegistry>,
    blobs: &Arc<MemoryBlobStore>,
    mappings: &Arc<MemoryMappingStore>,
) -> Collaborators {
    Collaborators {
        land_registry: registry.clone(),
        smart_accounts: Arc::new(DisabledSmartAccountClient),
        hasher: Arc::new(Sha256RawHasher),
        blob_store: blobs.clone(),
        mappings: mappings.clone(),
    }
}
