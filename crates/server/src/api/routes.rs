use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{batch, catalog, handlers, volumes};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Storage volumes
        .route("/volumes", get(volumes::list_volumes))
        .route("/volumes/refresh", post(volumes::refresh_volumes))
        // Catalog
        .route("/catalog", get(catalog::list_catalog))
        .route("/catalog/search", get(catalog::search_catalog))
        .route("/catalog/scan", post(catalog::start_scan))
        .route(
            "/catalog/{folder}",
            get(catalog::get_entry).delete(catalog::delete_entry),
        )
        .route("/catalog/{folder}/videos", get(catalog::list_videos))
        .route("/assets", get(catalog::list_assets))
        // Transcoding
        .route("/batch", post(batch::submit_batch))
        .route("/batch/stop", post(batch::stop_batch))
        .route("/jobs", get(batch::list_jobs))
        .route("/repair", get(batch::start_repair).post(batch::start_repair))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
