use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use mediagate_core::models::{CreatedMedia, Media, NewMedia};
use mediagate_core::AppError;
use uuid::Uuid;

use super::with_deadline;
use crate::auth::Identity;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/media",
    tag = "media",
    responses(
        (status = 200, description = "All media, newest first", body = Vec<Media>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 504, description = "Storage did not answer in time", body = ErrorResponse)
    )
)]
pub async fn list_media(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let media = with_deadline(
        "list media",
        state.deadlines.list_media,
        state.media.list_media(),
    )
    .await?;
    Ok(Json(media))
}

#[utoipa::path(
    get,
    path = "/media/{id}",
    tag = "media",
    params(
        ("id" = Uuid, Path, description = "Media ID")
    ),
    responses(
        (status = 200, description = "Media found", body = Media),
        (status = 400, description = "Malformed media ID", body = ErrorResponse),
        (status = 404, description = "Media not found", body = ErrorResponse)
    )
)]
pub async fn get_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::InvalidInput(format!("invalid media id: {}", id)))?;

    let media = with_deadline(
        "get media",
        state.deadlines.storage,
        state.media.get_media_by_id(id),
    )
    .await
    .inspect_err(|e| {
        if !matches!(e, AppError::NotFound(_)) {
            tracing::error!(error = %e, media_id = %id, "Failed to fetch media");
        }
    })?;

    Ok(Json(media))
}

/// Create a listing owned by the caller.
///
/// The body is fully decoded and validated before the repository is touched.
#[utoipa::path(
    post,
    path = "/media",
    tag = "media",
    request_body = NewMedia,
    responses(
        (status = 201, description = "Media created", body = CreatedMedia),
        (status = 400, description = "Malformed or invalid body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn create_media(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    ValidatedJson(new_media): ValidatedJson<NewMedia>,
) -> Result<impl IntoResponse, HttpAppError> {
    new_media.validate()?;
    let media = new_media.into_media(identity.as_str());

    let id = with_deadline(
        "create media",
        state.deadlines.storage,
        state.media.create_media(media),
    )
    .await
    .inspect_err(|e| tracing::error!(error = %e, user_id = %identity.as_str(), "Failed to create media"))?;

    tracing::info!(media_id = %id, user_id = %identity.as_str(), "Media created");

    Ok((StatusCode::CREATED, Json(CreatedMedia { id })))
}
