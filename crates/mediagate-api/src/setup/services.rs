//! Collaborator wiring

use std::sync::Arc;

use anyhow::{Context, Result};
use mediagate_core::Config;
use mediagate_db::{create_identity_store, create_media_repository};
use mediagate_processing::{ExifExtractor, VideoPipeline, VideoPipelineConfig};
use sqlx::PgPool;

use crate::auth::{ServerKey, TokenService};
use crate::services::TracingNotifier;
use crate::state::{AppState, Deadlines, SessionCookie};

/// Build the application state from configuration and an optional pool.
pub fn initialize_services(config: &Config, pool: Option<PgPool>) -> Result<Arc<AppState>> {
    let token = config.token();
    let tokens = Arc::new(TokenService::new(
        ServerKey::from_secret(token.secret.as_bytes()),
        chrono::Duration::minutes(token.ttl_minutes),
    ));

    let video = VideoPipeline::new(VideoPipelineConfig::from(config.video()))
        .context("Invalid video pipeline configuration")?;

    tracing::info!(
        storage = if pool.is_some() { "postgres" } else { "memory" },
        token_ttl_minutes = token.ttl_minutes,
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        tokens,
        media: create_media_repository(pool),
        identity: create_identity_store(),
        notifier: Arc::new(TracingNotifier),
        exif: ExifExtractor::default(),
        video,
        cookie: SessionCookie {
            name: token.cookie_name.clone(),
            secure: config.tls().is_some(),
        },
        deadlines: Deadlines::default(),
    }))
}
