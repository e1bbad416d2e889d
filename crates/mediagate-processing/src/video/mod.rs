//! Video metadata extraction through an external ffmpeg process

pub mod ffmetadata;
pub mod pipeline;
pub mod temp_file;

pub use pipeline::{VideoPipeline, VideoPipelineConfig};
pub use temp_file::{PipelineState, ScopedTempFile};
