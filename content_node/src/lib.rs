//! Content node: validates, authorizes and stores signed scene deployments
//! for land parcels.

pub mod api;
pub mod authorization;
pub mod config;
pub mod content;
pub mod crypto;
pub mod deployment;
pub mod error;
pub mod metrics;
pub mod node;
pub mod storage;
pub mod types;

pub use error::{DeployError, Result};
