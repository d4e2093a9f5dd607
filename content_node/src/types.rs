//! Deployment data model shared by the pipeline, the stores and the API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Well-known scene descriptor file name
pub const SCENE_DESCRIPTOR: &str = "scene.json";

/// Declares that the file at `name` has content identifier `cid`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentMapping {
    pub cid: String,
    pub name: String,
}

impl ContentMapping {
    pub fn new(cid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            name: name.into(),
        }
    }

    /// Entries ending in a path separator mark directories and carry no bytes
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }

    pub fn is_scene_descriptor(&self) -> bool {
        self.name == SCENE_DESCRIPTOR
    }
}

/// Signed deploy descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deploy {
    #[serde(default)]
    pub required: Vec<ContentMapping>,
    #[serde(default)]
    pub positions: Vec<String>,
    #[serde(default)]
    pub mappings_hash: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// Binds a deploy id and timestamp to the submitting address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployProof {
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl DeployProof {
    /// The exact message covered by `signature`
    pub fn signed_message(&self) -> String {
        format!("{}.{}", self.id, self.timestamp)
    }
}

/// What the mapping store keeps about an accepted deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployMetadata {
    pub proof: DeployProof,
    pub positions: Vec<String>,
    pub deployed_at: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid parcel coordinates: {0}")]
pub struct ParcelParseError(pub String);

/// Land parcel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Parcel {
    pub x: i32,
    pub y: i32,
}

impl Parcel {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl FromStr for Parcel {
    type Err = ParcelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| ParcelParseError(s.to_string()))?;
        let x = x
            .trim()
            .parse::<i32>()
            .map_err(|_| ParcelParseError(s.to_string()))?;
        let y = y
            .trim()
            .parse::<i32>()
            .map_err(|_| ParcelParseError(s.to_string()))?;
        Ok(Self { x, y })
    }
}

impl fmt::Display for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parcel_parse() {
        assert_eq!("0,0".parse::<Parcel>().unwrap(), Parcel::new(0, 0));
        assert_eq!("-12, 140".parse::<Parcel>().unwrap(), Parcel::new(-12, 140));
        assert!("12".parse::<Parcel>().is_err());
        assert!("a,b".parse::<Parcel>().is_err());
        assert!("1,2,3".parse::<Parcel>().is_err());
        assert_eq!(Parcel::new(-3, 7).to_string(), "-3,7");
    }

    #[test]
    fn test_directory_marker() {
        assert!(ContentMapping::new("b1", "models/").is_directory());
        assert!(!ContentMapping::new("b1", "models/tree.glb").is_directory());
        assert!(ContentMapping::new("b1", "scene.json").is_scene_descriptor());
    }

    #[test]
    fn test_deploy_json_field_names() {
        let deploy: Deploy = serde_json::from_str(
            r#"{"required":[{"cid":"b1","name":"scene.json"}],"positions":["0,0"],"mappingsHash":"b2","timestamp":10}"#,
        )
        .unwrap();
        assert_eq!(deploy.mappings_hash, "b2");
        assert_eq!(deploy.positions, vec!["0,0".to_string()]);

        let proof: DeployProof = serde_json::from_str(r#"{"id":"b3","timestamp":42}"#).unwrap();
        assert!(proof.signature.is_empty());
        assert_eq!(proof.signed_message(), "b3.42");
    }
}
