//! EXIF tag extraction with a bounded one-shot handoff
//!
//! Parsing runs on the blocking pool. The worker hands back exactly one
//! `Result` through a oneshot channel; the caller waits on that channel under
//! a deadline. A worker that panics drops its sender, which the caller sees as
//! a closed channel, so the wait always terminates.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use exif::{In, Reader, Value};
use mediagate_core::AppError;
use tokio::sync::oneshot;

use crate::metadata::ExifTags;

pub const DEFAULT_EXIF_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ExifExtractor {
    deadline: Duration,
}

impl Default for ExifExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_EXIF_DEADLINE)
    }
}

impl ExifExtractor {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Extract the primary-image EXIF tags from `data`.
    ///
    /// The deadline releases the caller, not the worker: a parse already
    /// running on the blocking pool cannot be interrupted and finishes on its
    /// own. Its cost is bounded by the image body cap (`MAX_IMAGE_SIZE_MB`,
    /// 20 MB by default) enforced before the body reaches this call.
    #[tracing::instrument(skip(self, data), fields(image.size = data.len()))]
    pub async fn extract(&self, data: Bytes) -> Result<ExifTags, AppError> {
        let (tx, rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            // Waiter already gone (deadline hit before the worker started).
            if tx.is_closed() {
                return;
            }
            let _ = tx.send(parse_exif(&data));
        });

        match tokio::time::timeout(self.deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AppError::Internal(
                "EXIF worker exited without producing a result".to_string(),
            )),
            Err(_) => {
                tracing::warn!(deadline_ms = self.deadline.as_millis() as u64, "EXIF extraction timed out");
                Err(AppError::timeout("exif extraction", self.deadline))
            }
        }
    }
}

/// Parse EXIF tags from an image container (JPEG, TIFF, PNG, WebP, HEIF).
///
/// Only fields attached to the primary image are returned; thumbnail IFD
/// duplicates are skipped.
pub fn parse_exif(data: &[u8]) -> Result<ExifTags, AppError> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .map_err(|e| {
            tracing::debug!(error = %e, "EXIF decode failed");
            AppError::UnsupportedMedia(format!("unable to read image metadata: {}", e))
        })?;

    let mut tags = BTreeMap::new();
    for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
        let value = match &field.value {
            Value::Ascii(parts) => parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').to_string())
                .collect::<Vec<_>>()
                .join(", "),
            _ => field.display_value().with_unit(&exif).to_string(),
        };
        tags.insert(field.tag.to_string(), value);
    }

    if tags.is_empty() {
        return Err(AppError::UnsupportedMedia(
            "image carries no EXIF tags".to_string(),
        ));
    }

    Ok(ExifTags(tags))
}
