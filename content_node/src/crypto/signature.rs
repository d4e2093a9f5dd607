use super::smart_account::{SmartAccountClient, ERC1654_MAGIC_VALUE};
use super::SignatureError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use log::debug;
use sha3::{Digest, Keccak256};
use std::sync::Arc;

/// Signatures longer than this (in characters, as submitted) are treated as
/// smart-account signatures. Plain 65-byte signatures are 132 characters.
pub const SMART_ACCOUNT_SIGNATURE_THRESHOLD: usize = 150;

const SIGNED_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Keccak-256 of `message` under the signed-message framing
pub fn hash_message(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(SIGNED_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

pub fn is_smart_account_signature(signature: &str) -> bool {
    signature.len() > SMART_ACCOUNT_SIGNATURE_THRESHOLD
}

/// Address (0x-prefixed lowercase hex) controlled by `key`
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed point tag
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recover the signing address of `signature` over `message`
pub fn recover_address(message: &str, signature: &str) -> Result<String, SignatureError> {
    let bytes = decode_hex(signature)?;
    if bytes.len() != 65 {
        return Err(SignatureError::InvalidEncoding(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }

    let v = match bytes[64] {
        27 | 28 => bytes[64] - 27,
        v => v,
    };
    if v > 1 {
        return Err(SignatureError::InvalidEncoding(format!("invalid recovery id {}", bytes[64])));
    }
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| SignatureError::InvalidEncoding(format!("invalid recovery id {}", v)))?;
    let sig = Signature::from_slice(&bytes[..64])
        .map_err(|e| SignatureError::InvalidEncoding(e.to_string()))?;

    let hash = hash_message(message.as_bytes());
    let key = VerifyingKey::recover_from_prehash(&hash, &sig, recovery_id)
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;
    Ok(address_of(&key))
}

/// Whether `signature` over `message` was produced by `address`.
/// Malformed input yields `false`.
pub fn verify(message: &str, signature: &str, address: &str) -> bool {
    let expected = match normalize_address(address) {
        Some(a) => a,
        None => return false,
    };
    match recover_address(message, signature) {
        Ok(recovered) => recovered == expected,
        Err(e) => {
            debug!("Signature rejected: {}", e);
            false
        }
    }
}

/// Sign `message` under the signed-message framing; returns 0x-prefixed
/// hex with a legacy (27/28) recovery byte
pub fn sign_message(key: &SigningKey, message: &str) -> Result<String, SignatureError> {
    let hash = hash_message(message.as_bytes());
    let (sig, recovery_id) = key
        .sign_prehash_recoverable(&hash)
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;
    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    Ok(format!("0x{}", hex::encode(bytes)))
}

fn decode_hex(value: &str) -> Result<Vec<u8>, SignatureError> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(trimmed).map_err(|e| SignatureError::InvalidEncoding(e.to_string()))
}

fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.strip_prefix("0x").unwrap_or(address);
    if trimmed.len() != 40 || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("0x{}", trimmed.to_ascii_lowercase()))
}

/// Dispatches between key recovery and on-chain smart-account checks
#[derive(Clone)]
pub struct SignatureVerifier {
    smart_accounts: Arc<dyn SmartAccountClient>,
}

impl SignatureVerifier {
    pub fn new(smart_accounts: Arc<dyn SmartAccountClient>) -> Self {
        Self { smart_accounts }
    }

    /// Verify a deploy signature. Only infrastructure failures on the
    /// smart-account path are errors; a bad signature is `Ok(false)`.
    pub async fn verify(&self, message: &str, signature: &str, address: &str) -> Result<bool, SignatureError> {
        if is_smart_account_signature(signature) {
            debug!("Using smart-account verification for {}", address);
            self.verify_against_account(address, message, signature).await
        } else {
            Ok(verify(message, signature, address))
        }
    }

    pub async fn verify_against_account(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<bool, SignatureError> {
        let sig_bytes = match decode_hex(signature) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Smart-account signature rejected: {}", e);
                return Ok(false);
            }
        };
        let hash = hash_message(message.as_bytes());
        let result = self
            .smart_accounts
            .call_is_valid_signature(address, hash, &sig_bytes)
            .await?;
        Ok(result == ERC1654_MAGIC_VALUE)
    }
}
