// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP handlers -- map requests onto the imaging pipelines and the generative
// backend, and serialize the JSON responses.
//
// Image work is CPU-bound and runs on tokio's blocking pool.  Every failure is
// reported as `{"error": <message>}` with 400 for caller mistakes and 500 for
// everything else.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use divdraw_core::error::{DivDrawError, Result};
use divdraw_imaging::codec::{self, PNG_MIME};
use divdraw_imaging::{convert_to_sketch, evaluate as evaluate_sketches};

use crate::enhance;
use crate::input::{self, RequestPayload};
use crate::server::AppState;

/// Message returned when `/convert` has no upload.
pub const NO_IMAGE: &str = "No image provided";

/// Message returned when `/evaluate` is missing either drawing.
pub const BOTH_SKETCHES_REQUIRED: &str = "Both original_sketch and user_sketch required";

/// Message returned when `/enhance` has no merged image.
pub const NO_MERGED_IMAGE: &str = "No merged image provided";

/// Liveness message served on `/`.
pub const LIVENESS_MESSAGE: &str = "Divide & Draw backend running";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error response: a status code plus the message sent as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<DivDrawError> for ApiError {
    fn from(err: DivDrawError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = self.status.as_u16(), error = %self.message, "Request failed");
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub sketch: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub success: bool,
    pub coverage_percent: f64,
    pub iou_percent: f64,
    pub visualization: String,
}

#[derive(Debug, Serialize)]
pub struct EnhanceResponse {
    pub success: bool,
    pub description: String,
    pub enhanced_image: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /`
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: LIVENESS_MESSAGE,
    })
}

/// `POST /convert` -- multipart `image` to a PNG line sketch.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn convert(
    mut payload: RequestPayload,
) -> std::result::Result<Json<ConvertResponse>, ApiError> {
    let image = payload
        .take(&input::CONVERT_IMAGE)?
        .ok_or_else(|| DivDrawError::MissingInput(NO_IMAGE.into()))?;

    let sketch = run_blocking(move || convert_to_sketch(&image)).await?;
    info!(png_len = sketch.len(), "Sketch conversion served");

    Ok(Json(ConvertResponse {
        success: true,
        sketch: codec::to_data_url(&sketch, PNG_MIME),
    }))
}

/// `POST /evaluate` -- score a user drawing against a reference sketch.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn evaluate(
    mut payload: RequestPayload,
) -> std::result::Result<Json<EvaluateResponse>, ApiError> {
    let original = payload.take(&input::EVALUATE_ORIGINAL)?;
    let user = payload.take(&input::EVALUATE_USER)?;
    let (Some(original), Some(user)) = (original, user) else {
        return Err(DivDrawError::MissingInput(BOTH_SKETCHES_REQUIRED.into()).into());
    };

    let evaluation = run_blocking(move || evaluate_sketches(&original, &user)).await?;
    info!(
        coverage = evaluation.metrics.coverage_percent,
        iou = evaluation.metrics.iou_percent,
        "Evaluation served"
    );

    Ok(Json(EvaluateResponse {
        success: true,
        coverage_percent: evaluation.metrics.coverage_percent,
        iou_percent: evaluation.metrics.iou_percent,
        visualization: codec::to_data_url(&evaluation.visualization_png, PNG_MIME),
    }))
}

/// `POST /enhance` -- polish a merged drawing through the generative backend.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn enhance(
    State(state): State<AppState>,
    mut payload: RequestPayload,
) -> std::result::Result<Json<EnhanceResponse>, ApiError> {
    let merged = payload
        .take(&input::ENHANCE_MERGED)?
        .ok_or_else(|| DivDrawError::MissingInput(NO_MERGED_IMAGE.into()))?;

    let enhancement = enhance::polish_sketch(state.backend.as_ref(), merged).await?;
    info!(
        backend = state.backend.name(),
        png_len = enhancement.image_png.len(),
        description_len = enhancement.description.len(),
        "Enhancement served"
    );

    Ok(Json(EnhanceResponse {
        success: true,
        description: enhancement.description,
        enhanced_image: codec::to_data_url(&enhancement.image_png, PNG_MIME),
    }))
}

/// Run CPU-bound image work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| DivDrawError::Server(format!("image task join: {err}")))?
}
