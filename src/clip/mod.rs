//! Clip extraction and preview streaming.
//!
//! [`ClipService`] ties the pipeline together: resolve the media, probe the
//! source, derive encoder parameters, run ffmpeg. Admission is bounded by a
//! semaphore sized from config; a request that finds no free slot fails with
//! [`Error::Busy`] instead of queueing behind an unknown amount of work.

pub mod eviction;
pub mod resolver;

pub use resolver::ResolvedClip;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, ToolsConfig};
use crate::error::{Error, Result};
use crate::plex::PlexServer;
use crate::probe::probe;
use crate::transcode::{Backend, EncodeParams, ToolCommand, PREVIEW_HEIGHT};

/// A single clip or preview request, as it came off the wire.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    /// Numeric item identifier, still in string form.
    pub rating_key: String,
    /// Explicit rendition id, when the caller wants a specific file.
    pub media_id: Option<i64>,
    pub from: String,
    pub to: String,
    /// Target height; 0 keeps the source height.
    pub height: u32,
    /// Target quantizer; 0 keeps the backend default.
    pub qp: u32,
}

/// A finished clip on disk.
#[derive(Debug, Clone)]
pub struct FinishedClip {
    /// Where the encoder wrote the artifact.
    pub path: PathBuf,
    /// The human-readable download name, without the uniquifying prefix.
    pub filename: String,
}

pub struct ClipService {
    plex: Arc<PlexServer>,
    tools: ToolsConfig,
    backend: Backend,
    output_dir: PathBuf,
    encode_slots: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ClipService {
    pub fn new(plex: Arc<PlexServer>, config: &Config) -> Self {
        Self {
            plex,
            tools: config.tools.clone(),
            backend: config.transcode.backend,
            output_dir: config.transcode.output_dir.clone(),
            encode_slots: Arc::new(Semaphore::new(config.transcode.max_concurrent)),
            max_concurrent: config.transcode.max_concurrent,
        }
    }

    /// The directory finished clips land in.
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Extract a clip to a uniquely named file in the output directory.
    ///
    /// Runs the full pipeline and blocks until the encode finishes. On a
    /// non-zero encoder exit the partial file is removed and the captured
    /// stderr is returned verbatim in the error. Dropping the future kills
    /// the encoder.
    pub async fn clip(&self, request: &ClipRequest, user: &str) -> Result<FinishedClip> {
        let _permit = self.acquire_slot()?;

        let ResolvedClip {
            source_url,
            filename,
            tags,
        } = resolver::resolve(&self.plex, request, user).await?;

        let probed = probe(&self.tools.ffprobe(), &source_url).await?;

        let params = EncodeParams {
            source_url,
            from: request.from.clone(),
            to: request.to.clone(),
            backend: self.backend,
            height: request.height,
            qp: request.qp,
            source_codec: probed.video_codec,
            tags,
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self
            .output_dir
            .join(format!("{}-{}", Uuid::new_v4(), filename));

        info!(
            backend = %self.backend,
            codec = %params.source_codec,
            stream_copy = !params.requires_reencode(),
            "Starting clip encode"
        );

        let command = ToolCommand::new(self.tools.ffmpeg()).args(params.clip_args(&path));
        debug!(command = %command.display_line(), "Encoder invocation");

        let output = command.capture().await?;

        if !output.stderr.trim().is_empty() {
            warn!(stderr = %output.stderr.trim(), "Encoder diagnostics");
        }

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(Error::Encode(output.stderr));
        }

        info!(path = %path.display(), "Clip encode finished");
        Ok(FinishedClip { path, filename })
    }

    /// Start a preview encode and hand back the encoder's stdout.
    ///
    /// The preview re-encodes unconditionally at a fixed height and streams
    /// fragmented MP4; any quality override on the request is not honored.
    /// A background task reaps the encoder and logs its diagnostics; once
    /// the returned reader is dropped the encoder loses its pipe and exits.
    pub async fn preview(&self, request: &ClipRequest, user: &str) -> Result<ChildStdout> {
        let permit = self.acquire_slot()?;

        let ResolvedClip {
            source_url, tags, ..
        } = resolver::resolve(&self.plex, request, user).await?;

        let params = EncodeParams {
            source_url,
            from: request.from.clone(),
            to: request.to.clone(),
            backend: self.backend,
            height: PREVIEW_HEIGHT,
            qp: 0,
            // Previews never stream copy, so the probed codec would go
            // unused; skipping the probe keeps startup latency down.
            source_codec: String::new(),
            tags,
        };

        info!(backend = %self.backend, "Starting preview encode");

        let command = ToolCommand::new(self.tools.ffmpeg()).args(params.preview_args());
        debug!(command = %command.display_line(), "Encoder invocation");

        let mut child = command.spawn_streaming()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("preview encoder stdout not piped".to_string()))?;
        let stderr = child.stderr.take();

        tokio::spawn(async move {
            let mut diagnostics = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut diagnostics).await;
            }

            match child.wait().await {
                Ok(status) if status.success() => {
                    if !diagnostics.trim().is_empty() {
                        warn!(stderr = %diagnostics.trim(), "Encoder diagnostics");
                    }
                    debug!("Preview encode finished");
                }
                Ok(status) => {
                    // Headers are long sent; delivery just truncates.
                    error!(%status, stderr = %diagnostics.trim(), "Preview encoder exited with error");
                }
                Err(e) => error!("Failed to reap preview encoder: {}", e),
            }

            drop(permit);
        });

        Ok(stdout)
    }

    fn acquire_slot(&self) -> Result<OwnedSemaphorePermit> {
        self.encode_slots
            .clone()
            .try_acquire_owned()
            .map_err(|_| Error::Busy(self.max_concurrent))
    }
}
