//! Mediagate Media Processing
//!
//! Metadata extraction pipelines for untrusted uploads:
//! - `image`: embedded EXIF tags, parsed off the async runtime and handed back
//!   through a one-shot channel bounded by a deadline
//! - `video`: container metadata and an optional thumbnail through an external
//!   `ffmpeg` process working on a scoped temporary file

pub mod metadata;

#[cfg(feature = "image")]
pub mod image;
#[cfg(feature = "video")]
pub mod video;

pub use metadata::{ExifTags, VideoOutput};

#[cfg(feature = "image")]
pub use image::ExifExtractor;
#[cfg(feature = "video")]
pub use video::{PipelineState, ScopedTempFile, VideoPipeline, VideoPipelineConfig};
