use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::coordinator::{AggregateResult, Coordinator};

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub number: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteResponse {
    pub objects_written: usize,
    pub time_taken: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl From<AggregateResult> for WriteResponse {
    fn from(result: AggregateResult) -> Self {
        Self {
            objects_written: result.objects_written,
            time_taken: format!("{:?}", result.time_taken),
            errors: result.errors,
        }
    }
}

#[derive(Debug, Error)]
pub enum RejectError {
    #[error("Only POST requests are accepted")]
    MethodNotAllowed,
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("The 'number' value must be a positive integer")]
    NonPositiveNumber,
}

impl IntoResponse for RejectError {
    fn into_response(self) -> Response {
        let status = match self {
            RejectError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RejectError::InvalidJson(_) | RejectError::NonPositiveNumber => {
                StatusCode::BAD_REQUEST
            }
        };
        (status, self.to_string()).into_response()
    }
}

pub fn router(coordinator: Coordinator) -> Router {
    Router::new()
        .route("/", post(write_objects).fallback(method_not_allowed))
        .with_state(coordinator)
}

async fn method_not_allowed() -> RejectError {
    RejectError::MethodNotAllowed
}

/// Validates the request, then writes `number` objects. Answers 500 if any
/// single object failed, even though the others were written.
async fn write_objects(
    State(coordinator): State<Coordinator>,
    body: Bytes,
) -> Result<(StatusCode, Json<WriteResponse>), RejectError> {
    let request: WriteRequest = serde_json::from_slice(&body)?;
    let count = usize::try_from(request.number)
        .ok()
        .filter(|&n| n > 0)
        .ok_or(RejectError::NonPositiveNumber)?;

    info!(
        "Received request to create {} objects in bucket '{}'",
        count,
        coordinator.bucket()
    );

    let result = coordinator.run(count).await;
    let status = if result.errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok((status, Json(result.into())))
}
