//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::auth::Credentials;
use crate::error::ErrorResponse;
use crate::handlers;
use crate::services::{Delivery, MailMessage, Tip};
use mediagate_core::models::{CreatedMedia, Media, NewMedia, Profile, Transaction, Withdrawal};
use mediagate_processing::{ExifTags, VideoOutput};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mediagate API",
        version = "0.1.0",
        description = "Gateway for the media marketplace: token authentication, media listings, identity lookups and metadata extraction for image and video uploads."
    ),
    paths(
        handlers::health::root,
        handlers::health::secure,
        handlers::auth::authenticate,
        handlers::auth::reauthenticate,
        handlers::media::list_media,
        handlers::media::get_media,
        handlers::media::create_media,
        handlers::profile::get_profile,
        handlers::profile::list_transactions,
        handlers::profile::list_withdrawals,
        handlers::notify::send_mail,
        handlers::notify::post_tip,
        handlers::exif::extract_exif,
        handlers::video::video_metadata,
    ),
    components(schemas(
        ErrorResponse,
        Credentials,
        Media,
        NewMedia,
        CreatedMedia,
        Profile,
        Transaction,
        Withdrawal,
        MailMessage,
        Tip,
        Delivery,
        ExifTags,
        VideoOutput,
    )),
    tags(
        (name = "health", description = "Liveness checks"),
        (name = "auth", description = "Token issuance"),
        (name = "media", description = "Media listings"),
        (name = "profile", description = "Identity store lookups"),
        (name = "notifications", description = "Mail and chat notifications"),
        (name = "processing", description = "Image and video metadata extraction"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_gateway_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/", "/authenticate", "/media/{id}", "/exif", "/video/metadata"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
