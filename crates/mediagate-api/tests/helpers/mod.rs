//! Test helpers: build AppState and router for integration tests.
//!
//! Every test app gets its own signing key and in-memory stores, so tests
//! never share tokens or data.

#![allow(dead_code)]

pub mod fixtures;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use mediagate_api::auth::{ServerKey, TokenService};
use mediagate_api::services::TracingNotifier;
use mediagate_api::{build_router, AppState, Deadlines, RouterOptions, SessionCookie};
use mediagate_db::{InMemoryIdentityStore, InMemoryMediaRepository};
use mediagate_processing::{ExifExtractor, VideoPipeline, VideoPipelineConfig};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const COOKIE_NAME: &str = "pro_token";
pub const ALLOWED_ORIGIN: &str = "http://localhost:4200";

/// Test application: server plus handles on the in-memory collaborators.
pub struct TestApp {
    pub server: TestServer,
    pub tokens: Arc<TokenService>,
    pub media: Arc<InMemoryMediaRepository>,
    pub identity: Arc<InMemoryIdentityStore>,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Issue a token directly, bypassing `/authenticate`.
    pub fn token_for(&self, identity: &str) -> String {
        self.tokens
            .issue(identity)
            .expect("Failed to issue token")
            .token
    }
}

pub fn test_video_config(ffmpeg_path: &str, temp_dir: &Path) -> VideoPipelineConfig {
    VideoPipelineConfig {
        ffmpeg_path: ffmpeg_path.to_string(),
        temp_dir: temp_dir.to_path_buf(),
        thumbnail_offset: Duration::from_secs(4),
        timeout: Duration::from_secs(10),
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {})
}

/// Fresh collaborators for one test: isolated key, stores and temp dir.
struct TestParts {
    state: Arc<AppState>,
    tokens: Arc<TokenService>,
    media: Arc<InMemoryMediaRepository>,
    identity: Arc<InMemoryIdentityStore>,
    temp_dir: TempDir,
}

fn test_parts(configure_video: impl FnOnce(&mut VideoPipelineConfig)) -> TestParts {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let secret = format!("{}{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
    let tokens = Arc::new(TokenService::new(
        ServerKey::from_secret(secret.as_bytes()),
        chrono::Duration::minutes(30),
    ));

    let mut video_config = test_video_config("ffmpeg", temp_dir.path());
    configure_video(&mut video_config);
    let video = VideoPipeline::new(video_config).expect("Invalid video config");

    let media = Arc::new(InMemoryMediaRepository::new());
    let identity = Arc::new(InMemoryIdentityStore::new());

    let state = Arc::new(AppState {
        tokens: tokens.clone(),
        media: media.clone(),
        identity: identity.clone(),
        notifier: Arc::new(TracingNotifier),
        exif: ExifExtractor::default(),
        video,
        cookie: SessionCookie {
            name: COOKIE_NAME.to_string(),
            secure: false,
        },
        deadlines: Deadlines::default(),
    });

    TestParts {
        state,
        tokens,
        media,
        identity,
        temp_dir,
    }
}

pub fn test_router_options() -> RouterOptions {
    RouterOptions {
        cors_origins: vec![ALLOWED_ORIGIN.to_string()],
        ..RouterOptions::default()
    }
}

/// Build a test app, letting the caller adjust the video pipeline config
/// (the temp dir defaults to a fresh directory owned by the app).
pub fn setup_test_app_with(configure_video: impl FnOnce(&mut VideoPipelineConfig)) -> TestApp {
    let parts = test_parts(configure_video);
    let app = build_router(parts.state, &test_router_options()).expect("Failed to build router");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        tokens: parts.tokens,
        media: parts.media,
        identity: parts.identity,
        temp_dir: parts.temp_dir,
    }
}

/// Serve the router on a real loopback socket, for tests that need control
/// over the bytes on the wire.
pub async fn spawn_router(options: &RouterOptions) -> (SocketAddr, Arc<TokenService>, TempDir) {
    let parts = test_parts(|_| {});
    let app = build_router(parts.state, options).expect("Failed to build router");
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    (addr, parts.tokens, parts.temp_dir)
}

/// `POST /authenticate` and return the token from the JSON body.
pub async fn login(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/authenticate")
        .json(&serde_json::json!({ "username": username }))
        .await;
    response.assert_status_ok();
    response.json::<String>()
}

pub fn session_cookie(token: &str) -> String {
    format!("{}={}", COOKIE_NAME, token)
}
