//! Progress notification capability for user-visible status updates.
//!
//! A narrow seam injected into the video-link flow so the chat transport
//! can update its status message. Delivery is best-effort: a failed
//! notification is logged by the orchestrator and never aborts a pipeline.

use thiserror::Error;

/// Milestones surfaced while a video link is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// The audio track has been extracted; transcription is next.
    AudioExtracted,
    /// The transcript is ready; the summary is being requested.
    TranscriptReady,
}

/// A notification that could not be delivered.
#[derive(Error, Debug)]
#[error("progress notification failed: {0}")]
pub struct NotifyError(pub String);

/// Best-effort delivery of run progress.
pub trait ProgressNotifier: Send + Sync {
    fn notify(&self, stage: ProgressStage) -> Result<(), NotifyError>;
}

/// Notifier that ignores every update; used by the voice flow.
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn notify(&self, _stage: ProgressStage) -> Result<(), NotifyError> {
        Ok(())
    }
}
