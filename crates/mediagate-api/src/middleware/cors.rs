//! CORS policy for browser clients
//!
//! `CorsLayer` decorates responses; `cors_preflight_guard` sits outside it and
//! refuses preflights from origins that are not on the allow-list, instead of
//! answering them without CORS headers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{
            ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION, CONTENT_TYPE, ORIGIN, SET_COOKIE,
        },
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use mediagate_core::constants::{LEGACY_TOKEN_HEADER_NAME, TOKEN_HEADER_NAME};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::PUT,
    Method::POST,
    Method::DELETE,
    Method::OPTIONS,
];

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<HeaderValue>,
    /// `*` configured: reflect any origin (refused by config validation in production)
    mirror_any: bool,
}

impl CorsPolicy {
    pub fn from_origins(origins: &[String]) -> Result<Self, anyhow::Error> {
        let mirror_any = origins.iter().any(|o| o == "*");
        let origins = origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .map(|o| {
                HeaderValue::from_str(o.trim_end_matches('/'))
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { origins, mirror_any })
    }

    pub fn allows(&self, origin: &HeaderValue) -> bool {
        self.mirror_any || self.origins.iter().any(|o| o == origin)
    }

    pub fn layer(&self) -> CorsLayer {
        let allow_origin = if self.mirror_any {
            tracing::warn!("CORS configured to mirror any origin - not recommended for production");
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::list(self.origins.clone())
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(ALLOWED_METHODS)
            .allow_headers([
                CONTENT_TYPE,
                HeaderName::from_static("x-requested-by"),
                SET_COOKIE,
                HeaderName::from_static(LEGACY_TOKEN_HEADER_NAME),
                HeaderName::from_static(TOKEN_HEADER_NAME),
                AUTHORIZATION,
            ])
            .allow_credentials(true)
    }
}

pub async fn cors_preflight_guard(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let is_preflight = request.method() == Method::OPTIONS
        && request.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD);

    if is_preflight {
        let allowed = request
            .headers()
            .get(ORIGIN)
            .is_some_and(|origin| policy.allows(origin));
        if !allowed {
            tracing::debug!(
                origin = ?request.headers().get(ORIGIN),
                "Rejected CORS preflight from disallowed origin"
            );
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_matches_exact_origins() {
        let policy = CorsPolicy::from_origins(&["https://app.example.com/".to_string()]).unwrap();
        assert!(policy.allows(&HeaderValue::from_static("https://app.example.com")));
        assert!(!policy.allows(&HeaderValue::from_static("https://evil.example.com")));
    }

    #[test]
    fn test_wildcard_mirrors() {
        let policy = CorsPolicy::from_origins(&["*".to_string()]).unwrap();
        assert!(policy.allows(&HeaderValue::from_static("https://anything.test")));
    }
}
