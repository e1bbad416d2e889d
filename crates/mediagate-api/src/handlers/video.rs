use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use mediagate_core::AppError;
use mediagate_processing::VideoOutput;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct VideoMetadataQuery {
    /// Also extract a PNG frame at the configured offset
    #[serde(default)]
    pub thumbnail: bool,
}

/// Run the video pipeline on a raw video body.
#[utoipa::path(
    post,
    path = "/video/metadata",
    tag = "processing",
    params(VideoMetadataQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Container metadata", body = VideoOutput),
        (status = 400, description = "Empty body", body = ErrorResponse),
        (status = 502, description = "ffmpeg failed", body = ErrorResponse),
        (status = 504, description = "ffmpeg exceeded its deadline", body = ErrorResponse)
    )
)]
pub async fn video_metadata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VideoMetadataQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    if body.is_empty() {
        return Err(AppError::InvalidInput("request body is empty".to_string()).into());
    }

    let output = state
        .video
        .run(&body, query.thumbnail)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Video metadata extraction failed"))?;

    Ok(Json(output))
}
