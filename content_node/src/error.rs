//! Pipeline error taxonomy.
//!
//! Each stage fails fast with one of these; the tag decides the HTTP status
//! and whether the message may be shown to the client.

use crate::authorization::AuthorizationError;
use crate::crypto::SignatureError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    /// Malformed or policy-violating request
    #[error("{0}")]
    InvalidArgument(String),

    /// Structural validation failure on a parsed entity
    #[error("{0}")]
    RequiredValue(String),

    /// Authorization check failed
    #[error("{0}")]
    Unauthorized(String),

    /// Lower-level infrastructure failure
    #[error("unexpected error: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;

impl DeployError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn required(message: impl Into<String>) -> Self {
        Self::RequiredValue(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(anyhow::anyhow!(message.into()))
    }

    /// Storage "not found" means the caller referenced a file the service
    /// never received, and a rejected key came from a malformed content id;
    /// anything else is infrastructure
    pub fn from_storage(file: &str, err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => Self::InvalidArgument(format!("file: {} not found", file)),
            StorageError::InvalidKey(key) => {
                Self::InvalidArgument(format!("invalid content id {} for file: {}", key, file))
            }
            other => Self::Unexpected(anyhow::Error::new(other).context(format!("storage lookup for {}", file))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::InvalidArgument(_) => "invalid_argument",
            DeployError::RequiredValue(_) => "required_value",
            DeployError::Unauthorized(_) => "unauthorized",
            DeployError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<AuthorizationError> for DeployError {
    fn from(err: AuthorizationError) -> Self {
        match err {
            AuthorizationError::NoParcels => Self::RequiredValue(err.to_string()),
            AuthorizationError::InvalidParcel(_) => Self::InvalidArgument(err.to_string()),
            AuthorizationError::Registry(_) => Self::Unexpected(anyhow::Error::new(err)),
        }
    }
}

impl From<SignatureError> for DeployError {
    fn from(err: SignatureError) -> Self {
        Self::Unexpected(anyhow::Error::new(err).context("smart-account signature check"))
    }
}
