use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use mediagate_core::models::{Profile, Transaction, Withdrawal};
use mediagate_core::AppError;

use super::with_deadline;
use crate::auth::Identity;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Profile of the calling identity.
#[utoipa::path(
    get,
    path = "/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Caller profile", body = Profile),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No profile for this identity", body = ErrorResponse)
    )
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<impl IntoResponse, HttpAppError> {
    let profile = with_deadline(
        "get profile",
        state.deadlines.storage,
        state.identity.get_profile(identity.as_str()),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/profile/transactions",
    tag = "profile",
    responses(
        (status = 200, description = "Sales and purchases involving the caller", body = Vec<Transaction>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<impl IntoResponse, HttpAppError> {
    let transactions = with_deadline(
        "list transactions",
        state.deadlines.storage,
        state.identity.list_transactions(identity.as_str()),
    )
    .await?;
    Ok(Json(transactions))
}

#[utoipa::path(
    get,
    path = "/profile/withdrawals",
    tag = "profile",
    responses(
        (status = 200, description = "Withdrawal requests made by the caller", body = Vec<Withdrawal>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<impl IntoResponse, HttpAppError> {
    let withdrawals = with_deadline(
        "list withdrawals",
        state.deadlines.storage,
        state.identity.list_withdrawals(identity.as_str()),
    )
    .await?;
    Ok(Json(withdrawals))
}
