//! Domain types for inbound media references and on-disk artifacts.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// A user-supplied audio source, before any local file exists.
///
/// Created when the chat transport classifies an inbound message; consumed
/// once by the acquisition stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaReference {
    /// A chat-hosted voice attachment, addressed by an opaque identifier.
    VoiceAttachment {
        attachment_id: String,
        /// Clip length as reported by the transport, if known.
        duration_hint: Option<Duration>,
    },
    /// A link to a video whose audio track should be processed.
    VideoLink { url: String },
}

impl MediaReference {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            MediaReference::VoiceAttachment { attachment_id, .. } => {
                format!("voice attachment {attachment_id}")
            }
            MediaReference::VideoLink { url } => format!("video link {url}"),
        }
    }
}

/// Logical role of a transient on-disk file within a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A voice attachment as downloaded from the chat transport.
    RawVoice,
    /// The audio track extracted from a video link.
    RawVideoAudio,
    /// Audio transcoded to the transcription provider's input contract.
    NormalizedAudio,
}

impl ArtifactKind {
    /// File extension used for artifacts of this kind.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::RawVoice => "oga",
            ArtifactKind::RawVideoAudio => "mp3",
            ArtifactKind::NormalizedAudio => "wav",
        }
    }

    pub(crate) fn file_prefix(self) -> &'static str {
        match self {
            ArtifactKind::RawVoice => "voice",
            ArtifactKind::RawVideoAudio => "extracted",
            ArtifactKind::NormalizedAudio => "normalized",
        }
    }
}

/// A transient on-disk file produced by one pipeline stage and consumed or
/// deleted by a later one.
///
/// Artifacts are only created through a run's cleanup scope, which deletes
/// whatever is still registered when the run terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    kind: ArtifactKind,
}

impl Artifact {
    pub(crate) fn new(path: PathBuf, kind: ArtifactKind) -> Self {
        Self { path, kind }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }
}

/// Recognized text for one media reference.
///
/// Empty text is a valid terminal state (silence), distinct from failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
}

impl Transcript {
    /// True when no speech was recognized.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Result of the video-link flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDigest {
    /// Full transcript of the video's audio track.
    pub transcript: String,
    /// `None` when the transcript was empty and there was nothing to
    /// summarize.
    pub summary: Option<String>,
}
