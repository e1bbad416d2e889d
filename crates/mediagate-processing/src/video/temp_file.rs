//! Scoped temporary file holding one video upload

use std::fmt;
use std::io;
use std::path::Path;

use tempfile::TempPath;

const TEMP_PREFIX: &str = "mediagate-video-";

/// Lifecycle of a single pipeline invocation.
///
/// `Cleaned` is reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    FileWritten,
    SubprocessRunning,
    Succeeded,
    Failed,
    Cleaned,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Created => "created",
            PipelineState::FileWritten => "file_written",
            PipelineState::SubprocessRunning => "subprocess_running",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Failed => "failed",
            PipelineState::Cleaned => "cleaned",
        };
        f.write_str(name)
    }
}

/// A uniquely named file removed exactly once: by `cleanup`, or on drop when
/// the owning pipeline exits early or is cancelled.
pub struct ScopedTempFile {
    path: Option<TempPath>,
    state: PipelineState,
}

impl ScopedTempFile {
    /// Reserve a new empty file inside `dir`.
    pub fn create_in(dir: &Path) -> io::Result<Self> {
        let path = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".upload")
            .tempfile_in(dir)?
            .into_temp_path();
        tracing::debug!(path = %path.display(), "Scoped temp file created");
        Ok(Self {
            path: Some(path),
            state: PipelineState::Created,
        })
    }

    /// Path of the file, or `None` once cleaned.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn transition(&mut self, next: PipelineState) {
        tracing::trace!(from = %self.state, to = %next, "Video pipeline state");
        self.state = next;
    }

    /// Write the upload body; moves the file to `FileWritten`.
    pub async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "temp file already cleaned"))?;
        tokio::fs::write(path, data).await?;
        self.transition(PipelineState::FileWritten);
        Ok(())
    }

    /// Remove the file now. Subsequent calls are no-ops.
    pub fn cleanup(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.to_path_buf();
            if let Err(e) = path.close() {
                tracing::warn!(path = %shown.display(), error = %e, "Failed to remove temp file");
            }
            self.transition(PipelineState::Cleaned);
        }
    }
}

impl Drop for ScopedTempFile {
    fn drop(&mut self) {
        if self.path.is_some() {
            tracing::debug!(state = %self.state, "Scoped temp file dropped before explicit cleanup");
            self.cleanup();
        }
    }
}
