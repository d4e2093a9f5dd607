use crate::api::handlers::{contents, parcels, status};
use crate::deployment::{ContentQueries, DeploymentService};
use crate::metrics::DeployMetrics;
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

// Application State
#[derive(Clone)]
pub struct AppState {
    pub deployments: Arc<DeploymentService>,
    pub queries: ContentQueries,
    pub metrics: DeployMetrics,
    pub metrics_enabled: bool,
    pub max_upload_bytes: usize,
}

// API Router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(status::health_check))
        // Deploys and blobs
        .route("/contents", post(contents::upload_content))
        .route("/contents/:cid", get(contents::get_content))
        .route("/blobs/:cid", get(contents::get_blob))
        .route("/asset_status", post(contents::asset_status))
        // Parcel views
        .route("/mappings", get(parcels::get_mappings))
        .route("/validate", get(parcels::validate_parcel));

    if state.metrics_enabled {
        router = router.route("/metrics", get(status::metrics));
    }

    router
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any),
        )
        .with_state(state)
}

// Server startup
pub async fn start_api_server(bind_address: &str, state: AppState) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("Content node listening on http://{}", bind_address);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
