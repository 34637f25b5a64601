use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dray_queue::{JobId, JobRecord, JobService, JobStatus, NewJob, Priority, QueueError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<JobService>,
}

/// Builds the HTTP API:
///
/// - `POST /jobs` submits a job and returns its id
/// - `GET /jobs/{id}` reports a job's current record
/// - `GET /health` liveness probe
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/jobs", post(submit_job))
        .route("/jobs/{id}", get(job_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub priority: Option<Priority>,
    pub payload: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub status: JobStatus,
    pub priority: Priority,
    pub attempts: u32,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRecord> for JobStatusResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id.to_string(),
            job_type: record.job_type,
            status: record.status,
            priority: record.priority,
            attempts: record.attempts,
            result: record.result,
            error: record.error,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn submit_job(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::bad_request(rejection.to_string()))?;

    let job = NewJob::new(
        request.job_type.unwrap_or_default(),
        request.priority.unwrap_or_default(),
        request.payload.unwrap_or(Value::Null),
    );
    let job_id = state.service.submit(job).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            job_id: job_id.to_string(),
        }),
    ))
}

async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let record = state.service.status(&JobId::from(id)).await?;
    Ok(Json(record.into()))
}

/// Wire-level error: a status code and a client-safe message.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::InvalidRequest(message) => Self {
                status: StatusCode::BAD_REQUEST,
                message,
            },
            QueueError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: "Job not found".to_string(),
            },
            other => {
                error!(error = %other, "Request failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal Server Error".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
