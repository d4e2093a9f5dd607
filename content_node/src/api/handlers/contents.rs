//! Deploy upload and blob lookups

use crate::api::errors::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::deployment::{RawPart, UploadRequest};
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header naming the client that produced the upload
pub const UPLOAD_ORIGIN_HEADER: &str = "x-upload-origin";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct AssetStatusRequest {
    #[serde(default)]
    pub content: Vec<String>,
}

/// POST /contents
pub async fn upload_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        parts.push(RawPart {
            name,
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }
    debug!("Received deploy upload with {} parts", parts.len());

    let request = UploadRequest::from_parts(parts, upload_origin(&headers))?;
    let receipt = state.deployments.deploy(request).await?;

    Ok(Json(UploadResponse {
        success: true,
        id: receipt.id,
    }))
}

/// GET /contents/:cid
pub async fn get_content(State(state): State<AppState>, Path(cid): Path<String>) -> ApiResult<Response> {
    match state.queries.content_location(&cid).await? {
        Some(location) => Ok(Redirect::temporary(&location).into_response()),
        None => Err(ApiError::not_found(&format!("content {} not found", cid))),
    }
}

/// GET /blobs/:cid
///
/// Serves blob bytes for stores whose public locator points back at this node
pub async fn get_blob(State(state): State<AppState>, Path(cid): Path<String>) -> ApiResult<Response> {
    match state.queries.content_bytes(&cid).await? {
        Some(data) => Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data).into_response()),
        None => Err(ApiError::not_found(&format!("content {} not found", cid))),
    }
}

/// POST /asset_status
pub async fn asset_status(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<BTreeMap<String, bool>>> {
    let request: AssetStatusRequest = serde_json::from_slice(&body)?;
    let status = state.queries.asset_status(&request.content).await?;
    Ok(Json(status))
}

fn upload_origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get(UPLOAD_ORIGIN_HEADER)
        .or_else(|| headers.get(header::ORIGIN))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
