//! Application state shared by every handler.
//!
//! Collaborators are injected at construction so tests can assemble an
//! isolated state (fresh signing key, in-memory stores) per case.

use std::sync::Arc;
use std::time::Duration;

use mediagate_db::{IdentityStore, MediaRepository};
use mediagate_processing::{ExifExtractor, VideoPipeline};

use crate::auth::TokenService;
use crate::services::Notifier;

/// Session cookie settings applied on `/authenticate` and `/reauthenticate`
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    /// Set the `Secure` attribute (TLS termination is active)
    pub secure: bool,
}

/// Per-operation deadlines for collaborator calls
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub list_media: Duration,
    pub storage: Duration,
    pub notify: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            list_media: Duration::from_secs(3),
            storage: Duration::from_secs(5),
            notify: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub media: Arc<dyn MediaRepository>,
    pub identity: Arc<dyn IdentityStore>,
    pub notifier: Arc<dyn Notifier>,
    pub exif: ExifExtractor,
    pub video: VideoPipeline,
    pub cookie: SessionCookie,
    pub deadlines: Deadlines,
}
