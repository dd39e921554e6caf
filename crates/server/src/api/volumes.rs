//! Storage volume API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use reelhouse_core::{PlacementStrategy, Volume};
use serde::Serialize;

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VolumeListResponse {
    pub strategy: PlacementStrategy,
    pub volumes: Vec<Volume>,
}

/// GET /api/v1/volumes
pub async fn list_volumes(State(state): State<Arc<AppState>>) -> Json<VolumeListResponse> {
    let allocator = state.allocator();
    Json(VolumeListResponse {
        strategy: allocator.strategy(),
        volumes: allocator.volumes(),
    })
}

/// POST /api/v1/volumes/refresh
///
/// Re-measures the usage of every enabled volume.
pub async fn refresh_volumes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VolumeListResponse>, ApiError> {
    let allocator = state.allocator();
    let volumes = allocator
        .refresh_usage()
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(VolumeListResponse {
        strategy: allocator.strategy(),
        volumes,
    }))
}
