//! Parcel content views

use crate::api::errors::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::deployment::ParcelContent;
use crate::types::{DeployMetadata, Parcel};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct MappingsQuery {
    pub nw: Option<String>,
    pub se: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub x: Option<String>,
    pub y: Option<String>,
}

/// GET /mappings?nw=x,y&se=x,y
pub async fn get_mappings(
    State(state): State<AppState>,
    Query(query): Query<MappingsQuery>,
) -> ApiResult<Json<Vec<ParcelContent>>> {
    let nw = corner("nw", query.nw.as_deref())?;
    let se = corner("se", query.se.as_deref())?;
    Ok(Json(state.queries.parcel_contents(nw, se).await?))
}

/// GET /validate?x=&y=
pub async fn validate_parcel(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> ApiResult<Json<DeployMetadata>> {
    let x = coordinate("x", query.x.as_deref())?;
    let y = coordinate("y", query.y.as_deref())?;
    let parcel = Parcel::new(x, y);

    state
        .queries
        .parcel_metadata(parcel)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(&format!("no deploy found for parcel {}", parcel)))
}

fn corner(name: &str, value: Option<&str>) -> ApiResult<Parcel> {
    let value = value.ok_or_else(|| ApiError::bad_request(&format!("missing query parameter: {}", name)))?;
    value
        .parse()
        .map_err(|e| ApiError::bad_request(&format!("{}: {}", name, e)))
}

fn coordinate(name: &str, value: Option<&str>) -> ApiResult<i32> {
    let value = value.ok_or_else(|| ApiError::bad_request(&format!("missing query parameter: {}", name)))?;
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(&format!("invalid coordinate {}: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_parsing() {
        assert_eq!(corner("nw", Some("-3,7")).unwrap(), Parcel::new(-3, 7));
        assert_eq!(corner("nw", None).unwrap_err().code, 400);
        assert_eq!(corner("se", Some("3")).unwrap_err().code, 400);
    }

    #[test]
    fn test_coordinate_parsing() {
        assert_eq!(coordinate("x", Some(" 12 ")).unwrap(), 12);
        assert_eq!(coordinate("y", Some("north")).unwrap_err().code, 400);
    }
}
