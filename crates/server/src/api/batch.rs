//! Batch and repair API handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use reelhouse_core::{
    jobs::{JobId, JobInfo, RegistryError},
    progress_channel, ProcessorError,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::events::sse_response;
use super::handlers::{api_error, ApiError, SuccessResponse};
use crate::state::AppState;

/// Response header carrying the id of a submitted batch.
pub const JOB_ID_HEADER: &str = "X-Job-ID";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub videos: Vec<String>,
    #[serde(default, alias = "useGPU")]
    pub use_acceleration: bool,
}

#[derive(Debug, Deserialize)]
pub struct StopParams {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobInfo>,
}

/// POST /api/v1/batch
///
/// Streams the batch's progress events; the job id is in `X-Job-ID`.
pub async fn submit_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Response, ApiError> {
    let (job_id, stream) = state
        .batch()
        .submit_batch(request.videos, request.use_acceleration)
        .map_err(|e| match e {
            ProcessorError::EmptyBatch => api_error(StatusCode::BAD_REQUEST, e.to_string()),
            _ => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    Ok((
        [(JOB_ID_HEADER, job_id.to_string())],
        sse_response(stream.into_stream()),
    )
        .into_response())
}

/// POST /api/v1/batch/stop?jobId=
pub async fn stop_batch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StopParams>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let job_id: JobId = params
        .job_id
        .parse()
        .map_err(|e: RegistryError| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.batch().request_stop(job_id) {
        Ok(()) => Ok(Json(SuccessResponse {
            message: format!("Stop requested for job {}", job_id),
        })),
        Err(ProcessorError::Registry(RegistryError::NotFound(_))) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Job not found or already finished: {}", job_id),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// GET /api/v1/jobs
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<JobListResponse> {
    Json(JobListResponse {
        jobs: state.batch().jobs(),
    })
}

/// GET|POST /api/v1/repair
///
/// Runs one repair pass, streaming its events with periodic heartbeats.
/// Closing the connection stops items that have not started yet.
pub async fn start_repair(State(state): State<Arc<AppState>>) -> Response {
    let config = state.processor_config();
    let (events, stream) = progress_channel(config.event_buffer);
    let cancel = CancellationToken::new();

    let repair = state.repair().clone();
    let worker_cancel = cancel.clone();
    tokio::spawn(async move {
        let results = repair.repair(events, worker_cancel).await;
        info!(episodes = results.len(), "Repair request finished");
    });

    let guard = cancel.drop_guard();
    let stream = stream
        .with_heartbeat(config.heartbeat_interval())
        .map(move |event| {
            let _connected = &guard;
            event
        });

    sse_response(stream).into_response()
}
