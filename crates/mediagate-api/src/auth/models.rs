use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use mediagate_core::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::HttpAppError;

/// Request body for `POST /authenticate`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Credentials {
    pub username: String,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub identity: String,
    pub expires_at: DateTime<Utc>,
}

/// Claim decoded from a token that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaim {
    pub identity: String,
    pub expires_at: DateTime<Utc>,
}

/// Caller identity attached to the request by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity(pub String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().cloned().ok_or_else(|| {
            HttpAppError(AppError::Unauthorized(
                "no identity on request".to_string(),
            ))
        })
    }
}

impl<S> FromRequestParts<S> for VerifiedClaim
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedClaim>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("no claim on request".to_string())))
    }
}
