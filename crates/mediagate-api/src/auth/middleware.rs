//! Per-route token check
//!
//! Applied with `route_layer` to the protected sub-router only, so public
//! routes and CORS preflights never reach it.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use mediagate_core::constants::{LEGACY_TOKEN_HEADER_NAME, TOKEN_HEADER_NAME};
use mediagate_core::AppError;

use super::models::Identity;
use super::token::TokenService;
use crate::error::HttpAppError;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub cookie_name: String,
}

/// Locate a token: session cookie, then `Authorization: Bearer`, then the
/// `pro_token` / `user_token` headers.
pub fn find_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    if let Some(bearer) = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        let bearer = bearer.trim();
        if !bearer.is_empty() {
            return Some(bearer.to_string());
        }
    }

    [TOKEN_HEADER_NAME, LEGACY_TOKEN_HEADER_NAME]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|h| h.to_str().ok())
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

pub async fn require_token(
    State(auth): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claim = find_token(request.headers(), &auth.cookie_name)
        .and_then(|token| auth.tokens.verify(&token));

    let Some(claim) = claim else {
        tracing::debug!(path = %request.uri().path(), "Rejected request without valid token");
        return HttpAppError(AppError::Unauthorized(
            "missing or invalid token".to_string(),
        ))
        .into_response();
    };

    request
        .extensions_mut()
        .insert(Identity(claim.identity.clone()));
    request.extensions_mut().insert(claim);

    next.run(request).await
}
