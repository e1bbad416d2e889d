use axum::{http::StatusCode, response::IntoResponse};

pub const PLACEHOLDER_BODY: &str = "Nothing to see here :-)";

/// Liveness check: answers `425 Too Early` with a fixed body.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 425, description = "Gateway is up", body = String)
    )
)]
pub async fn root() -> impl IntoResponse {
    let status = StatusCode::from_u16(425).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
    (status, PLACEHOLDER_BODY)
}

/// Trivial protected endpoint.
#[utoipa::path(
    get,
    path = "/secure",
    tag = "health",
    responses(
        (status = 200, description = "Caller holds a valid token", body = String),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    )
)]
pub async fn secure() -> &'static str {
    "Secure msg from gopro service"
}
