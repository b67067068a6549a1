//! Audio normalization to the transcription provider's input contract.
//!
//! Arbitrary input audio is transcoded to single-channel, 16 kHz, signed
//! 16-bit linear PCM. A transcode failure is assumed non-transient
//! (malformed or corrupt source) and surfaced immediately; there is no
//! retry.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::artifacts::ArtifactScope;
use crate::config::Settings;
use crate::models::{Artifact, ArtifactKind};
use crate::tools::{ToolRequest, ToolRunner};

/// Transcode binary invoked for normalization.
pub const TRANSCODER_BIN: &str = "ffmpeg";

/// Errors from the normalization stage.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("audio transcode failed: {detail}")]
    ToolFailure { detail: String },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

/// Transcodes raw artifacts into the fixed format the transcriber requires.
pub struct Normalizer {
    tools: Arc<dyn ToolRunner>,
    tool_timeout: Duration,
}

impl Normalizer {
    pub fn new(tools: Arc<dyn ToolRunner>, settings: &Settings) -> Self {
        Self {
            tools,
            tool_timeout: settings.pipeline.tool_timeout(),
        }
    }

    /// Transcode `input` into a new `NormalizedAudio` artifact.
    ///
    /// The input artifact is not deleted here; the run's scope releases it
    /// at run end.
    pub fn normalize(
        &self,
        scope: &ArtifactScope,
        input: &Artifact,
    ) -> Result<Artifact, NormalizeError> {
        let output = scope
            .create(ArtifactKind::NormalizedAudio)
            .map_err(|e| NormalizeError::Io {
                operation: "creating normalized artifact".to_string(),
                source: e,
            })?;

        let request = transcode_request(input.path(), output.path(), self.tool_timeout);
        tracing::debug!(
            input = %input.path().display(),
            output = %output.path().display(),
            "transcoding audio"
        );

        let result = self
            .tools
            .run(&request)
            .map_err(|e| NormalizeError::ToolFailure {
                detail: e.to_string(),
            })?;

        if !result.success() {
            return Err(NormalizeError::ToolFailure {
                detail: format!("exit code {}: {}", result.exit_code, result.combined),
            });
        }

        tracing::info!(output = %output.path().display(), "audio normalized");
        Ok(output)
    }
}

fn transcode_request(input: &Path, output: &Path, timeout: Duration) -> ToolRequest {
    ToolRequest::new(
        TRANSCODER_BIN,
        vec![
            "-i".to_string(),
            input.display().to_string(),
            "-y".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            "16000".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            output.display().to_string(),
        ],
        timeout,
    )
}
