//! Route configuration and setup

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use mediagate_core::{AppError, Config};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{require_token, AuthState};
use crate::error::HttpAppError;
use crate::handlers;
use crate::middleware::{
    cors_preflight_guard, request_id_middleware, security_headers_middleware, CorsPolicy,
    SecurityHeadersConfig,
};
use crate::state::AppState;

/// Router-level knobs, split from `Config` so tests can build a router directly.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub cors_origins: Vec<String>,
    pub max_image_size_bytes: usize,
    pub max_video_size_bytes: usize,
    /// Longest stall between two request body frames, on every route
    pub read_timeout: Duration,
    /// Upper bound for producing a response on non-upload routes
    pub write_timeout: Duration,
    /// Upper bound for a whole upload request, body and pipeline included
    pub upload_timeout: Duration,
    pub hsts: bool,
}

impl RouterOptions {
    pub fn from_config(config: &Config) -> Self {
        let timeouts = config.timeouts();
        Self {
            cors_origins: config.cors_origins().to_vec(),
            max_image_size_bytes: config.max_image_size_bytes(),
            max_video_size_bytes: config.max_video_size_bytes(),
            read_timeout: timeouts.read,
            write_timeout: timeouts.write,
            upload_timeout: timeouts.upload,
            hsts: config.tls().is_some(),
        }
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            cors_origins: vec!["http://localhost:4200".to_string()],
            max_image_size_bytes: 20 * 1024 * 1024,
            max_video_size_bytes: 500 * 1024 * 1024,
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            upload_timeout: Duration::from_secs(300),
            hsts: false,
        }
    }
}

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    build_router(state, &RouterOptions::from_config(config))
}

pub fn build_router(state: Arc<AppState>, options: &RouterOptions) -> Result<Router, anyhow::Error> {
    let cors_policy = Arc::new(CorsPolicy::from_origins(&options.cors_origins)?);
    let auth_state = Arc::new(AuthState {
        tokens: state.tokens.clone(),
        cookie_name: state.cookie.name.clone(),
    });
    let require_auth = axum::middleware::from_fn_with_state(auth_state, require_token);

    let public_routes = Router::new()
        .route("/", get(handlers::health::root))
        .route("/authenticate", post(handlers::auth::authenticate))
        .route("/openapi.json", get(handlers::openapi::openapi_json));

    let protected_routes = Router::new()
        .route("/reauthenticate", get(handlers::auth::reauthenticate))
        .route("/secure", get(handlers::health::secure))
        .route("/mail/send", post(handlers::notify::send_mail))
        .route("/slack/tip", post(handlers::notify::post_tip))
        .route(
            "/media",
            get(handlers::media::list_media).post(handlers::media::create_media),
        )
        .route("/media/{id}", get(handlers::media::get_media))
        .route("/profile", get(handlers::profile::get_profile))
        .route(
            "/profile/transactions",
            get(handlers::profile::list_transactions),
        )
        .route(
            "/profile/withdrawals",
            get(handlers::profile::list_withdrawals),
        )
        .route_layer(require_auth.clone());

    // Upload bodies are large: the short response timeout does not fit them,
    // but a stalled body is cut off like anywhere else.
    let upload_routes = Router::new()
        .route(
            "/exif",
            post(handlers::exif::extract_exif)
                .layer(DefaultBodyLimit::max(options.max_image_size_bytes)),
        )
        .route(
            "/video/metadata",
            post(handlers::video::video_metadata)
                .layer(DefaultBodyLimit::max(options.max_video_size_bytes)),
        )
        .route_layer(require_auth)
        .layer(TimeoutLayer::new(options.upload_timeout))
        .layer(RequestBodyTimeoutLayer::new(options.read_timeout));

    let standard_routes = public_routes
        .merge(protected_routes)
        .layer(TimeoutLayer::new(options.write_timeout))
        .layer(RequestBodyTimeoutLayer::new(options.read_timeout));

    let security_headers_config = Arc::new(SecurityHeadersConfig::new(options.hsts));

    let app = standard_routes
        .merge(upload_routes)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(RequestBodyLimitLayer::new(
            options
                .max_video_size_bytes
                .max(options.max_image_size_bytes),
        ))
        .layer(cors_policy.layer())
        .layer(axum::middleware::from_fn_with_state(
            cors_policy.clone(),
            cors_preflight_guard,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn_with_state(
            security_headers_config,
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

/// A panicking handler still produces exactly one error response.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    HttpAppError(AppError::Panic(detail)).into_response()
}
