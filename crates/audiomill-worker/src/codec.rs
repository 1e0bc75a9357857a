//! Audio extraction codec.
//!
//! The codec is an opaque collaborator: bytes in, mp3 bytes out, or a
//! failure. The production implementation shells out to ffmpeg; tests inject
//! their own implementations.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Transcode failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Codec: Send + Sync {
    /// Extract/transcode the audio track of `source` into mp3 bytes.
    async fn transcode(&self, source: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// ffmpeg subprocess codec. The binary path comes from configuration
/// (`FFMPEG_PATH`), as the container image decides where ffmpeg lives.
pub struct FfmpegCodec {
    ffmpeg_path: String,
}

impl FfmpegCodec {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

#[async_trait]
impl Codec for FfmpegCodec {
    async fn transcode(&self, source: &[u8]) -> Result<Vec<u8>, CodecError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| CodecError::Failed(format!("Failed to create temp directory: {}", e)))?;
        let input_path = temp_dir.path().join("input");
        let output_path = temp_dir.path().join("output.mp3");

        tokio::fs::write(&input_path, source)
            .await
            .map_err(|e| CodecError::Failed(format!("Failed to write source to temp file: {}", e)))?;

        let start = std::time::Instant::now();

        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(&input_path)
            .arg("-vn")
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-q:a")
            .arg("2")
            .arg(&output_path)
            .output()
            .await
            .map_err(|e| CodecError::Failed(format!("Failed to spawn ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // ffmpeg is chatty; keep the tail, which carries the actual error.
            let tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(CodecError::Failed(format!(
                "ffmpeg exited with {}: {}",
                output.status, tail
            )));
        }

        let product = tokio::fs::read(&output_path)
            .await
            .map_err(|e| CodecError::Failed(format!("Failed to read ffmpeg output: {}", e)))?;

        tracing::info!(
            input_bytes = source.len(),
            output_bytes = product.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Transcode successful"
        );

        Ok(product)
    }
}
