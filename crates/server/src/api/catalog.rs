//! Catalog API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use reelhouse_core::{
    catalog::{DeleteReport, VideoRef},
    CatalogEntry, CatalogError,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::handlers::{api_error, ApiError, SuccessResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogListResponse {
    pub entries: Vec<CatalogEntry>,
    pub total: usize,
}

impl From<Vec<CatalogEntry>> for CatalogListResponse {
    fn from(entries: Vec<CatalogEntry>) -> Self {
        Self {
            total: entries.len(),
            entries,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub folder_name: String,
    pub videos: Vec<VideoRef>,
}

#[derive(Debug, Serialize)]
pub struct AssetListResponse {
    pub assets: Vec<String>,
}

fn catalog_error(e: CatalogError) -> ApiError {
    match e {
        CatalogError::InvalidFolderName(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        CatalogError::NotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        _ => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/catalog
pub async fn list_catalog(State(state): State<Arc<AppState>>) -> Json<CatalogListResponse> {
    Json(state.catalog().list_entries_from_store().await.into())
}

/// GET /api/v1/catalog/search?q=
pub async fn search_catalog(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<CatalogListResponse> {
    Json(state.catalog().search(params.q.trim()).await.into())
}

/// POST /api/v1/catalog/scan
///
/// Starts a full reconciliation in the background.
pub async fn start_scan(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SuccessResponse>) {
    let catalog = Arc::clone(state.catalog());
    tokio::spawn(async move {
        let entries = catalog.scan_all().await;
        info!(titles = entries.len(), "Requested catalog scan finished");
    });
    (
        StatusCode::ACCEPTED,
        Json(SuccessResponse {
            message: "Catalog scan started".to_string(),
        }),
    )
}

/// GET /api/v1/catalog/{folder}
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(folder): Path<String>,
) -> Result<Json<CatalogEntry>, ApiError> {
    match state.catalog().resolve_by_folder(&folder).await {
        Ok(Some(entry)) => Ok(Json(entry)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Title not found: {}", folder),
        )),
        Err(e) => Err(catalog_error(e)),
    }
}

/// GET /api/v1/catalog/{folder}/videos
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    Path(folder): Path<String>,
) -> Result<Json<VideoListResponse>, ApiError> {
    let videos = state
        .catalog()
        .list_videos(&folder)
        .await
        .map_err(catalog_error)?;
    Ok(Json(VideoListResponse {
        folder_name: folder,
        videos,
    }))
}

/// DELETE /api/v1/catalog/{folder}
///
/// 404 when neither a directory nor a store row existed.
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(folder): Path<String>,
) -> Result<Json<DeleteReport>, ApiError> {
    let report = state
        .catalog()
        .delete_title(&folder)
        .await
        .map_err(catalog_error)?;

    if report.removed_dirs.is_empty() && !report.store_row_removed {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Title not found: {}", folder),
        ));
    }
    Ok(Json(report))
}

/// GET /api/v1/assets
///
/// Raw uploads and segmented playlists.
pub async fn list_assets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AssetListResponse>, ApiError> {
    let assets = state
        .catalog()
        .list_raw_assets()
        .await
        .map_err(catalog_error)?;
    Ok(Json(AssetListResponse { assets }))
}
