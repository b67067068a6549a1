//! Materializing a media reference as a local audio artifact.
//!
//! Two paths, dispatched on the reference kind: voice attachments are
//! resolved through the chat transport's [`AttachmentFetcher`] and
//! downloaded, video links are validated against the recognized grammar
//! and handed to the media-extraction tool.

mod link;

pub use link::is_recognized_video_url;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::artifacts::ArtifactScope;
use crate::config::Settings;
use crate::models::{Artifact, ArtifactKind, MediaReference};
use crate::tools::{ToolRequest, ToolRunner};

/// Media-extraction binary invoked for video links.
pub const EXTRACTOR_BIN: &str = "yt-dlp";

/// Where the chat transport stores a resolved attachment.
pub enum AttachmentSource {
    /// A transient download URL.
    Url(String),
    /// The attachment content itself.
    Bytes(Vec<u8>),
}

/// Failures reported by an attachment fetcher.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("attachment {0} no longer exists")]
    NotFound(String),

    #[error("attachment lookup failed: {0}")]
    Transport(String),
}

/// Resolves an opaque attachment identifier to downloadable content.
pub trait AttachmentFetcher: Send + Sync {
    fn resolve(&self, attachment_id: &str) -> Result<AttachmentSource, FetchError>;
}

/// Fetcher that substitutes the attachment id into a URL template,
/// e.g. `https://files.example.com/{id}`.
pub struct UrlAttachmentFetcher {
    template: String,
}

impl UrlAttachmentFetcher {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl AttachmentFetcher for UrlAttachmentFetcher {
    fn resolve(&self, attachment_id: &str) -> Result<AttachmentSource, FetchError> {
        Ok(AttachmentSource::Url(
            self.template.replace("{id}", attachment_id),
        ))
    }
}

/// Errors from the acquisition stage.
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("unrecognized video link: {0}")]
    InvalidReference(String),

    #[error("attachment not found: {0}")]
    NotFound(String),

    #[error("download failed: {0}")]
    Transport(String),

    #[error("media extraction failed: {detail}")]
    ToolFailure { detail: String },

    #[error("media extraction produced no audio")]
    EmptyOutput,

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl AcquireError {
    fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Obtains a local audio artifact from either reference kind.
pub struct Acquirer {
    fetcher: Arc<dyn AttachmentFetcher>,
    tools: Arc<dyn ToolRunner>,
    http: reqwest::blocking::Client,
    cookies_file: Option<PathBuf>,
    tool_timeout: Duration,
}

impl Acquirer {
    pub fn new(
        fetcher: Arc<dyn AttachmentFetcher>,
        tools: Arc<dyn ToolRunner>,
        settings: &Settings,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            fetcher,
            tools,
            http: reqwest::blocking::Client::builder()
                .timeout(settings.pipeline.attachment_timeout())
                .build()?,
            cookies_file: settings.paths.cookies_path(),
            tool_timeout: settings.pipeline.tool_timeout(),
        })
    }

    /// Materialize the reference as a raw audio artifact registered to the
    /// run's scope.
    pub fn acquire(
        &self,
        scope: &ArtifactScope,
        reference: &MediaReference,
    ) -> Result<Artifact, AcquireError> {
        match reference {
            MediaReference::VoiceAttachment {
                attachment_id,
                duration_hint,
            } => self.fetch_voice(scope, attachment_id, *duration_hint),
            MediaReference::VideoLink { url } => self.extract_video_audio(scope, url),
        }
    }

    fn fetch_voice(
        &self,
        scope: &ArtifactScope,
        attachment_id: &str,
        duration_hint: Option<Duration>,
    ) -> Result<Artifact, AcquireError> {
        tracing::info!(attachment = attachment_id, duration = ?duration_hint, "fetching voice attachment");

        let source = self.fetcher.resolve(attachment_id).map_err(|e| match e {
            FetchError::NotFound(id) => AcquireError::NotFound(id),
            FetchError::Transport(message) => AcquireError::Transport(message),
        })?;

        let artifact = scope
            .create(ArtifactKind::RawVoice)
            .map_err(|e| AcquireError::io("creating voice artifact", e))?;

        match source {
            AttachmentSource::Bytes(bytes) => {
                fs::write(artifact.path(), &bytes)
                    .map_err(|e| AcquireError::io("writing voice artifact", e))?;
            }
            AttachmentSource::Url(url) => self.download(&url, &artifact)?,
        }

        tracing::info!(path = %artifact.path().display(), "voice attachment stored");
        Ok(artifact)
    }

    fn download(&self, url: &str, artifact: &Artifact) -> Result<(), AcquireError> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| AcquireError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AcquireError::Transport(format!("status {status}: {body}")));
        }

        let mut file = fs::File::create(artifact.path())
            .map_err(|e| AcquireError::io("opening voice artifact for write", e))?;
        let mut response = response;
        response
            .copy_to(&mut file)
            .map_err(|e| AcquireError::Transport(e.to_string()))?;
        Ok(())
    }

    fn extract_video_audio(
        &self,
        scope: &ArtifactScope,
        url: &str,
    ) -> Result<Artifact, AcquireError> {
        if !link::is_recognized_video_url(url) {
            return Err(AcquireError::InvalidReference(url.to_string()));
        }

        let artifact = scope
            .create(ArtifactKind::RawVideoAudio)
            .map_err(|e| AcquireError::io("reserving extraction output", e))?;

        // The extractor insists on creating its output itself; it gets the
        // reserved name, not the placeholder file.
        match fs::remove_file(artifact.path()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(AcquireError::io("clearing extraction placeholder", e)),
        }

        let request = self.extraction_request(url, artifact.path());
        tracing::info!(url, output = %artifact.path().display(), "extracting audio track");

        let output = match self.tools.run(&request) {
            Ok(output) => output,
            Err(e) => {
                scope.release(&artifact);
                return Err(AcquireError::ToolFailure {
                    detail: e.to_string(),
                });
            }
        };

        if !output.success() {
            scope.release(&artifact);
            return Err(AcquireError::ToolFailure {
                detail: format!("exit code {}: {}", output.exit_code, output.combined),
            });
        }

        let size = fs::metadata(artifact.path()).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            tracing::warn!(url, output = %output.combined, "extractor produced no audio");
            scope.release(&artifact);
            return Err(AcquireError::EmptyOutput);
        }

        tracing::info!(bytes = size, "audio track extracted");
        Ok(artifact)
    }

    fn extraction_request(&self, url: &str, output: &Path) -> ToolRequest {
        let mut args = vec![
            "-o".to_string(),
            output.display().to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
        ];

        match &self.cookies_file {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "attaching cookies file");
                args.push("--cookies".to_string());
                args.push(path.display().to_string());
            }
            Some(path) => {
                tracing::warn!(path = %path.display(), "cookies file configured but missing, extracting without it");
            }
            None => {}
        }

        args.push(url.to_string());
        ToolRequest::new(EXTRACTOR_BIN, args, self.tool_timeout)
    }
}
