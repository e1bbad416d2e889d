//! Plain-HTTP listener: HTTP-01 challenges and redirects to HTTPS
//!
//! Never serves application routes.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use mediagate_core::TlsConfig;

#[derive(Debug, Clone)]
pub struct RedirectState {
    pub allowed_hosts: HashSet<String>,
    pub https_port: u16,
    pub challenge_dir: PathBuf,
}

impl RedirectState {
    pub fn from_config(config: &TlsConfig) -> Self {
        Self {
            allowed_hosts: config.hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            https_port: config.https_port,
            challenge_dir: config.challenge_dir.clone(),
        }
    }

    /// Allow-listed host named by the request, without its port.
    fn host(&self, headers: &HeaderMap) -> Option<String> {
        let host = headers.get(header::HOST)?.to_str().ok()?;
        let name = match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => host,
        };
        let name = name.trim_end_matches('.').to_ascii_lowercase();
        self.allowed_hosts.contains(&name).then_some(name)
    }
}

pub fn redirect_router(state: Arc<RedirectState>) -> Router {
    Router::new()
        .route(
            "/.well-known/acme-challenge/{token}",
            get(serve_challenge),
        )
        .fallback(redirect_to_https)
        .with_state(state)
}

fn is_challenge_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn serve_challenge(
    State(state): State<Arc<RedirectState>>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Response {
    if state.host(&headers).is_none() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if !is_challenge_token(&token) {
        return StatusCode::NOT_FOUND.into_response();
    }

    match tokio::fs::read(state.challenge_dir.join(&token)).await {
        Ok(body) => ([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response(),
        Err(e) => {
            tracing::debug!(token = %token, error = %e, "Unknown ACME challenge token");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn redirect_to_https(
    State(state): State<Arc<RedirectState>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let Some(host) = state.host(&headers) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let authority = if state.https_port == 443 {
        host
    } else {
        format!("{}:{}", host, state.https_port)
    };
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let location = format!("https://{}{}", authority, path_and_query);

    (
        StatusCode::PERMANENT_REDIRECT,
        [(header::LOCATION, location)],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    fn server(challenge_dir: PathBuf, https_port: u16) -> TestServer {
        let state = Arc::new(RedirectState {
            allowed_hosts: HashSet::from(["api.example.com".to_string()]),
            https_port,
            challenge_dir,
        });
        TestServer::new(redirect_router(state).into_make_service()).unwrap()
    }

    #[tokio::test]
    async fn test_redirects_allowed_host_with_query() {
        let server = server(PathBuf::from("/nonexistent"), 443);
        let response = server
            .get("/media/42?x=1")
            .add_header("Host", "api.example.com:80")
            .await;
        response.assert_status(StatusCode::PERMANENT_REDIRECT);
        assert_eq!(
            response.header("location"),
            "https://api.example.com/media/42?x=1"
        );
    }

    #[tokio::test]
    async fn test_non_default_https_port_kept() {
        let server = server(PathBuf::from("/nonexistent"), 8443);
        let response = server.get("/").add_header("Host", "api.example.com").await;
        assert_eq!(response.header("location"), "https://api.example.com:8443/");
    }

    #[tokio::test]
    async fn test_unknown_host_rejected() {
        let server = server(PathBuf::from("/nonexistent"), 443);
        server
            .get("/")
            .add_header("Host", "evil.example.com")
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_serves_challenge_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tok_en-1"), "tok_en-1.thumbprint").unwrap();
        let server = server(dir.path().to_path_buf(), 443);

        let response = server
            .get("/.well-known/acme-challenge/tok_en-1")
            .add_header("Host", "api.example.com")
            .await;
        response.assert_status_ok();
        response.assert_text("tok_en-1.thumbprint");

        server
            .get("/.well-known/acme-challenge/missing")
            .add_header("Host", "api.example.com")
            .await
            .assert_status_not_found();
    }
}
