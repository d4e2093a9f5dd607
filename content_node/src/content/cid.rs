//! Content identifiers (CIDs) for stored blobs.
//!
//! Two textual forms are accepted: CIDv0 (`Qm…`, base58btc, implicit dag-pb
//! codec) and CIDv1 (`b…`, lowercase base32 multibase). Only sha2-256
//! multihashes are supported.

use data_encoding::BASE32_NOPAD;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Multihash code for sha2-256
pub const SHA2_256: u64 = 0x12;
/// Multicodec for raw bytes
pub const RAW_CODEC: u64 = 0x55;
/// Multicodec for dag-pb (implicit for CIDv0)
pub const DAG_PB_CODEC: u64 = 0x70;

const CID_V0_LEN: usize = 46;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CidError {
    #[error("empty content identifier")]
    Empty,

    #[error("unsupported multibase prefix in {0}")]
    UnsupportedMultibase(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("unsupported CID version {0}")]
    UnsupportedVersion(u64),

    #[error("unsupported multihash code {0:#x}")]
    UnsupportedHash(u64),

    #[error("invalid digest length {0}")]
    InvalidDigestLength(u64),

    #[error("truncated content identifier")]
    Truncated,
}

/// Parsed content identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cid {
    version: u8,
    codec: u64,
    digest: [u8; 32],
}

impl Cid {
    /// Build a CIDv1 over a sha2-256 digest
    pub fn new_v1(codec: u64, digest: [u8; 32]) -> Self {
        Self {
            version: 1,
            codec,
            digest,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn codec(&self) -> u64 {
        self.codec
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Binary form: multihash only for v0, version + codec + multihash for v1
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(38);
        if self.version == 1 {
            write_varint(&mut out, 1);
            write_varint(&mut out, self.codec);
        }
        write_varint(&mut out, SHA2_256);
        write_varint(&mut out, 32);
        out.extend_from_slice(&self.digest);
        out
    }

    fn parse_v0(s: &str) -> Result<Self, CidError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CidError::InvalidEncoding(e.to_string()))?;
        let mut cursor = bytes.as_slice();
        let digest = read_multihash(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(CidError::InvalidEncoding(format!(
                "{} trailing bytes",
                cursor.len()
            )));
        }
        Ok(Self {
            version: 0,
            codec: DAG_PB_CODEC,
            digest,
        })
    }

    fn parse_v1(encoded: &str) -> Result<Self, CidError> {
        let bytes = BASE32_NOPAD
            .decode(encoded.to_ascii_uppercase().as_bytes())
            .map_err(|e| CidError::InvalidEncoding(e.to_string()))?;
        let mut cursor = bytes.as_slice();
        let version = read_varint(&mut cursor)?;
        if version != 1 {
            return Err(CidError::UnsupportedVersion(version));
        }
        let codec = read_varint(&mut cursor)?;
        let digest = read_multihash(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(CidError::InvalidEncoding(format!(
                "{} trailing bytes",
                cursor.len()
            )));
        }
        Ok(Self::new_v1(codec, digest))
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CidError::Empty);
        }
        if s.len() == CID_V0_LEN && s.starts_with("Qm") {
            return Self::parse_v0(s);
        }
        match s.strip_prefix('b') {
            Some(rest) if !rest.is_empty() => Self::parse_v1(rest),
            _ => Err(CidError::UnsupportedMultibase(s.to_string())),
        }
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            0 => write!(f, "{}", bs58::encode(self.to_bytes()).into_string()),
            _ => write!(
                f,
                "b{}",
                BASE32_NOPAD.encode(&self.to_bytes()).to_ascii_lowercase()
            ),
        }
    }
}

/// Computes the content identifier of a byte buffer
pub trait ContentHasher: Send + Sync {
    fn calculate_hash(&self, data: &[u8]) -> Cid;
}

/// CIDv1, raw codec, sha2-256
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256RawHasher;

impl ContentHasher for Sha256RawHasher {
    fn calculate_hash(&self, data: &[u8]) -> Cid {
        let digest: [u8; 32] = Sha256::digest(data).into();
        Cid::new_v1(RAW_CODEC, digest)
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn read_varint(cursor: &mut &[u8]) -> Result<u64, CidError> {
    let mut value = 0u64;
    for (i, byte) in cursor.iter().enumerate().take(9) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            *cursor = &cursor[i + 1..];
            return Ok(value);
        }
    }
    Err(CidError::Truncated)
}

fn read_multihash(cursor: &mut &[u8]) -> Result<[u8; 32], CidError> {
    let code = read_varint(cursor)?;
    if code != SHA2_256 {
        return Err(CidError::UnsupportedHash(code));
    }
    let len = read_varint(cursor)?;
    if len != 32 {
        return Err(CidError::InvalidDigestLength(len));
    }
    if cursor.len() < 32 {
        return Err(CidError::Truncated);
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&cursor[..32]);
    *cursor = &cursor[32..];
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_hash_is_deterministic() {
        let hasher = Sha256RawHasher;
        let a = hasher.calculate_hash(b"scene bytes");
        let b = hasher.calculate_hash(b"scene bytes");
        let c = hasher.calculate_hash(b"other bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.to_string().starts_with("bafkrei"));
    }

    #[test]
    fn test_known_empty_digest() {
        // sha2-256 of the empty string, raw codec
        let cid = Sha256RawHasher.calculate_hash(b"");
        assert_eq!(
            cid.to_string(),
            "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku"
        );
    }

    #[test]
    fn test_parse_v1_matches_display() {
        let cid = Sha256RawHasher.calculate_hash(b"hello");
        let parsed: Cid = cid.to_string().parse().unwrap();
        assert_eq!(parsed, cid);
        assert_eq!(parsed.codec(), RAW_CODEC);
    }

    #[test]
    fn test_parse_v0() {
        let cid: Cid = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
            .parse()
            .unwrap();
        assert_eq!(cid.version(), 0);
        assert_eq!(cid.codec(), DAG_PB_CODEC);
        assert_eq!(
            cid.to_string(),
            "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!("".parse::<Cid>(), Err(CidError::Empty));
        assert!("not-a-cid".parse::<Cid>().is_err());
        assert!("b!!!!".parse::<Cid>().is_err());
        assert!("zQm".parse::<Cid>().is_err());
        // valid base32, wrong version byte
        let bogus = format!("b{}", BASE32_NOPAD.encode(&[2, 0x55]).to_ascii_lowercase());
        assert!(bogus.parse::<Cid>().is_err());
    }
}
