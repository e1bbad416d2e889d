use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use bytes::Bytes;
use mediagate_core::AppError;
use mediagate_processing::ExifTags;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Extract EXIF tags from a raw image body.
///
/// The extractor enforces its own handoff deadline.
#[utoipa::path(
    post,
    path = "/exif",
    tag = "processing",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Tag name to value", body = ExifTags),
        (status = 400, description = "Empty body", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse),
        (status = 415, description = "Not an image with EXIF tags", body = ErrorResponse),
        (status = 504, description = "Extraction exceeded its deadline", body = ErrorResponse)
    )
)]
pub async fn extract_exif(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    if body.is_empty() {
        return Err(AppError::InvalidInput("request body is empty".to_string()).into());
    }

    let tags = state.exif.extract(body).await?;
    tracing::debug!(tag_count = tags.len(), "EXIF tags extracted");
    Ok(Json(tags))
}
