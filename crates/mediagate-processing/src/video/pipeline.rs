//! Video metadata pipeline: upload → scoped temp file → ffmpeg → result

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use mediagate_core::{AppError, VideoConfig};
use tokio::process::Command;

use super::ffmetadata::parse_global_tags;
use super::temp_file::{PipelineState, ScopedTempFile};
use crate::metadata::VideoOutput;

#[derive(Debug, Clone)]
pub struct VideoPipelineConfig {
    pub ffmpeg_path: String,
    pub temp_dir: PathBuf,
    pub thumbnail_offset: Duration,
    /// Budget for all subprocess work of one invocation
    pub timeout: Duration,
}

impl From<&VideoConfig> for VideoPipelineConfig {
    fn from(config: &VideoConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            temp_dir: config.temp_dir.clone(),
            thumbnail_offset: config.thumbnail_offset,
            timeout: config.timeout,
        }
    }
}

/// The binary is spawned directly, never through a shell; only empty paths,
/// NUL bytes and parent traversal are refused.
fn validate_executable(path: &str) -> Result<(), AppError> {
    if path.trim().is_empty() || path.contains('\0') {
        return Err(AppError::InvalidInput(format!(
            "ffmpeg path is not a usable executable path: {:?}",
            path
        )));
    }
    if Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(AppError::InvalidInput(format!(
            "ffmpeg path contains directory traversal: {}",
            path
        )));
    }
    Ok(())
}

/// One instance is shared by all requests; every `run` owns its own temp file
/// and child processes.
#[derive(Debug, Clone)]
pub struct VideoPipeline {
    config: VideoPipelineConfig,
}

impl VideoPipeline {
    pub fn new(config: VideoPipelineConfig) -> Result<Self, AppError> {
        validate_executable(&config.ffmpeg_path)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VideoPipelineConfig {
        &self.config
    }

    /// Extract container metadata (and optionally a PNG thumbnail) from `data`.
    ///
    /// The temp file is removed before this returns on every path. If the
    /// returned future is dropped early, the file is removed on drop and any
    /// running child is killed.
    #[tracing::instrument(skip(self, data), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.config.ffmpeg_path,
        video.size = data.len(),
        video.thumbnail = want_thumbnail
    ))]
    pub async fn run(&self, data: &[u8], want_thumbnail: bool) -> Result<VideoOutput, AppError> {
        let mut file = ScopedTempFile::create_in(&self.config.temp_dir).map_err(|e| {
            AppError::InternalWithSource {
                message: "Failed to create temp file for video upload".to_string(),
                source: e.into(),
            }
        })?;

        let result = self.process(&mut file, data, want_thumbnail).await;
        file.transition(if result.is_ok() {
            PipelineState::Succeeded
        } else {
            PipelineState::Failed
        });
        file.cleanup();

        result
    }

    async fn process(
        &self,
        file: &mut ScopedTempFile,
        data: &[u8],
        want_thumbnail: bool,
    ) -> Result<VideoOutput, AppError> {
        file.write_all(data).await?;
        let path = file
            .path()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::Internal("temp file missing after write".to_string()))?;

        file.transition(PipelineState::SubprocessRunning);
        let work = async {
            let raw = self.invoke(&self.metadata_args(&path)).await?;
            let metadata = String::from_utf8_lossy(&raw).into_owned();

            let thumbnail = if want_thumbnail {
                let png = self.invoke(&self.thumbnail_args(&path)).await?;
                (!png.is_empty()).then_some(png)
            } else {
                None
            };
            Ok::<_, AppError>((metadata, thumbnail))
        };

        let (metadata, thumbnail) = match tokio::time::timeout(self.config.timeout, work).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.timeout.as_secs_f64(),
                    "ffmpeg exceeded deadline, child killed"
                );
                return Err(AppError::timeout("video metadata extraction", self.config.timeout));
            }
        };

        Ok(VideoOutput {
            tags: parse_global_tags(&metadata),
            metadata,
            media_size: data.len() as u64,
            thumbnail,
        })
    }

    fn metadata_args(&self, input: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-map_metadata".to_string(),
            "0".to_string(),
            "-an".to_string(),
            "-vn".to_string(),
            "-sn".to_string(),
            "-dn".to_string(),
            "-f".to_string(),
            "ffmetadata".to_string(),
            "pipe:1".to_string(),
        ]
    }

    fn thumbnail_args(&self, input: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            format!("{:.3}", self.config.thumbnail_offset.as_secs_f64()),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-an".to_string(),
            "-f".to_string(),
            "image2pipe".to_string(),
            "-vcodec".to_string(),
            "png".to_string(),
            "pipe:1".to_string(),
        ]
    }

    /// Run ffmpeg to completion and return its stdout.
    async fn invoke(&self, args: &[String]) -> Result<Vec<u8>, AppError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to launch ffmpeg");
                AppError::Subprocess(format!(
                    "failed to launch {}: {}",
                    self.config.ffmpeg_path, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(status = %output.status, stderr = %stderr, "ffmpeg failed");
            return Err(AppError::Subprocess(format!(
                "ffmpeg exited with {}: {}",
                output.status, stderr
            )));
        }

        Ok(output.stdout)
    }
}
