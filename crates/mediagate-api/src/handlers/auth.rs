use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use mediagate_core::AppError;
use time::OffsetDateTime;

use super::with_deadline;
use crate::auth::{Credentials, IssuedToken, VerifiedClaim};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::{AppState, SessionCookie};

const MAX_USERNAME_LEN: usize = 256;

fn session_cookie(config: &SessionCookie, issued: &IssuedToken) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.name.clone(), issued.token.clone()))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .build();
    if let Ok(expires) = OffsetDateTime::from_unix_timestamp(issued.expires_at.timestamp()) {
        cookie.set_expires(expires);
    }
    cookie
}

/// Issue a token for `username`.
///
/// The token is set as the session cookie and also returned as a JSON string
/// for clients that do not keep cookies.
#[utoipa::path(
    post,
    path = "/authenticate",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "Token issued", body = String),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 415, description = "Body is not JSON", body = ErrorResponse)
    )
)]
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(credentials): ValidatedJson<Credentials>,
) -> Result<impl IntoResponse, HttpAppError> {
    let username = credentials.username.trim();
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "username must be between 1 and {} characters",
            MAX_USERNAME_LEN
        ))
        .into());
    }

    let issued = state.tokens.issue(username)?;

    let recorded = with_deadline(
        "record sign-in",
        state.deadlines.storage,
        state.identity.record_sign_in(username, chrono::Utc::now()),
    )
    .await;
    if let Err(e) = recorded {
        tracing::warn!(error = %e, user_id = %username, "Failed to record sign-in");
    }

    tracing::info!(user_id = %username, expires_at = %issued.expires_at, "Token issued");

    let jar = jar.add(session_cookie(&state.cookie, &issued));
    Ok((jar, Json(issued.token)))
}

/// Exchange a still-valid token for one with a later expiry.
#[utoipa::path(
    get,
    path = "/reauthenticate",
    tag = "auth",
    responses(
        (status = 200, description = "Token reissued", body = String),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn reauthenticate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    claim: VerifiedClaim,
) -> Result<impl IntoResponse, HttpAppError> {
    let issued = state.tokens.reissue(&claim)?;

    tracing::debug!(
        user_id = %issued.identity,
        expires_at = %issued.expires_at,
        "Token reissued"
    );

    let jar = jar.add(session_cookie(&state.cookie, &issued));
    Ok((jar, Json(issued.token)))
}
