//! Land ownership checks.
//!
//! A submitter may deploy to a set of parcels only if the land registry
//! reports update rights over every one of them.

pub mod land_registry;

pub use land_registry::{AccessData, HttpLandRegistry, LandRegistry};

use crate::types::Parcel;
use log::{debug, info};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("no parcels to authorize")]
    NoParcels,

    #[error("invalid parcel coordinates: {0}")]
    InvalidParcel(String),

    #[error("land registry error: {0}")]
    Registry(String),
}

#[derive(Clone)]
pub struct AuthorizationService {
    registry: Arc<dyn LandRegistry>,
}

impl AuthorizationService {
    pub fn new(registry: Arc<dyn LandRegistry>) -> Self {
        Self { registry }
    }

    /// `Ok(true)` iff `address` may update every parcel in `parcels`.
    ///
    /// Parcels are checked in order; the first one without access ends the
    /// check with `Ok(false)`. Malformed coordinates and registry failures
    /// are errors, not denials.
    pub async fn user_can_modify_parcels(
        &self,
        address: &str,
        parcels: &[String],
    ) -> Result<bool, AuthorizationError> {
        if parcels.is_empty() {
            return Err(AuthorizationError::NoParcels);
        }

        for raw in parcels {
            let parcel: Parcel = raw
                .parse()
                .map_err(|_| AuthorizationError::InvalidParcel(raw.clone()))?;

            let access = self
                .registry
                .get_parcel_access_data(address, parcel.x, parcel.y)
                .await?;
            debug!("Access for {} on {}: {}", address, parcel, access.has_access);

            if !access.has_access {
                info!("{} has no update rights over parcel {}", address, parcel);
                return Ok(false);
            }
        }

        Ok(true)
    }
}
