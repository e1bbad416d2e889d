//! Image metadata extraction

pub mod extract;

pub use extract::{parse_exif, ExifExtractor};
