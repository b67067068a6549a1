//! Composition of the pipeline stages into the two supported flows.
//!
//! A unit of work enters through [`Orchestrator::run_voice`] or
//! [`Orchestrator::run_video`], claims an admission slot, and runs
//! acquire → normalize → transcribe → (optionally) summarize in strict
//! sequence. Every exit path releases the run's artifacts before the slot
//! is freed; partial results are never surfaced as success.

mod gate;
mod progress;
mod run;

pub use gate::{AdmissionGate, SlotPermit};
pub use progress::{NoProgress, NotifyError, ProgressNotifier, ProgressStage};
pub use run::{PipelineRun, RunStage};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::acquire::{AcquireError, Acquirer, AttachmentFetcher};
use crate::artifacts::{ArtifactScope, ArtifactStore};
use crate::config::Settings;
use crate::models::{MediaReference, Transcript, VideoDigest};
use crate::normalize::{NormalizeError, Normalizer};
use crate::summarize::{HttpSummarizer, SummarizeError, Summarizer};
use crate::tools::{SystemToolRunner, ToolRunner};
use crate::transcribe::{HttpTranscriber, SpeechToText, TranscribeError};

/// Terminal error for one pipeline run.
///
/// Exactly one stage error, surfaced once as a single human-readable
/// message. Failures are terminal for the run, never for the process.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("acquisition failed: {0}")]
    Acquire(#[from] AcquireError),

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("transcription failed: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("summarization failed: {0}")]
    Summarize(#[from] SummarizeError),
}

/// Errors wiring the orchestrator together.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("failed to prepare storage roots: {0}")]
    Storage(#[from] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

struct RunOutput {
    transcript: Transcript,
    summary: Option<String>,
}

/// Composes the pipeline stages and enforces the concurrency ceiling.
pub struct Orchestrator {
    gate: AdmissionGate,
    store: Arc<ArtifactStore>,
    acquirer: Acquirer,
    normalizer: Normalizer,
    transcriber: Arc<dyn SpeechToText>,
    summarizer: Arc<dyn Summarizer>,
}

impl Orchestrator {
    /// Wire the production stages from settings.
    ///
    /// The attachment fetcher is supplied by the chat transport (or the
    /// CLI), since only it knows how attachment identifiers resolve.
    pub fn from_settings(
        settings: &Settings,
        fetcher: Arc<dyn AttachmentFetcher>,
    ) -> Result<Self, SetupError> {
        let tools: Arc<dyn ToolRunner> = Arc::new(SystemToolRunner);
        let transcriber = Arc::new(HttpTranscriber::new(settings)?);
        let summarizer = Arc::new(HttpSummarizer::new(settings)?);
        Self::with_stages(settings, fetcher, tools, transcriber, summarizer)
    }

    /// Wire with explicit stage implementations.
    ///
    /// Tests substitute deterministic fakes through this constructor.
    pub fn with_stages(
        settings: &Settings,
        fetcher: Arc<dyn AttachmentFetcher>,
        tools: Arc<dyn ToolRunner>,
        transcriber: Arc<dyn SpeechToText>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self, SetupError> {
        Ok(Self {
            gate: AdmissionGate::new(settings.pipeline.max_concurrent_runs),
            store: Arc::new(ArtifactStore::from_settings(&settings.paths)?),
            acquirer: Acquirer::new(fetcher, Arc::clone(&tools), settings)?,
            normalizer: Normalizer::new(tools, settings),
            transcriber,
            summarizer,
        })
    }

    /// Voice-note flow: transcript only.
    ///
    /// `session` is the owning chat identifier, passed through unexamined.
    pub fn run_voice(
        &self,
        session: &str,
        attachment_id: &str,
        duration_hint: Option<Duration>,
    ) -> Result<Transcript, PipelineError> {
        let reference = MediaReference::VoiceAttachment {
            attachment_id: attachment_id.to_string(),
            duration_hint,
        };
        self.run(session, reference, &NoProgress)
            .map(|output| output.transcript)
    }

    /// Video-link flow: transcript plus optional summary, with progress
    /// updates delivered through `progress`.
    pub fn run_video(
        &self,
        session: &str,
        url: &str,
        progress: &dyn ProgressNotifier,
    ) -> Result<VideoDigest, PipelineError> {
        let reference = MediaReference::VideoLink {
            url: url.to_string(),
        };
        self.run(session, reference, progress).map(|output| VideoDigest {
            transcript: output.transcript.text,
            summary: output.summary,
        })
    }

    /// Number of runs currently holding an admission slot.
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    fn run(
        &self,
        session: &str,
        reference: MediaReference,
        progress: &dyn ProgressNotifier,
    ) -> Result<RunOutput, PipelineError> {
        let permit = self.gate.admit();
        let mut run = PipelineRun::admitted(session);
        tracing::info!(run = %run.id(), media = %reference.describe(), "starting pipeline");

        let scope = ArtifactScope::new(Arc::clone(&self.store));
        let result = self.execute(&mut run, &scope, reference, progress);

        // Unconditional cleanup before the slot frees; the scope's Drop is
        // the backstop for a panicking stage.
        scope.release_all();
        run.finish(result.is_err());
        drop(permit);

        result
    }

    fn execute(
        &self,
        run: &mut PipelineRun,
        scope: &ArtifactScope,
        reference: MediaReference,
        progress: &dyn ProgressNotifier,
    ) -> Result<RunOutput, PipelineError> {
        let wants_summary = matches!(reference, MediaReference::VideoLink { .. });

        run.enter(RunStage::Acquiring);
        let raw = self.acquirer.acquire(scope, &reference)?;
        self.notify(run, progress, ProgressStage::AudioExtracted);

        run.enter(RunStage::Normalizing);
        let audio = self.normalizer.normalize(scope, &raw)?;

        run.enter(RunStage::Transcribing);
        let transcript = self.transcriber.transcribe(&audio)?;
        self.notify(run, progress, ProgressStage::TranscriptReady);

        let summary = if wants_summary && !transcript.is_empty() {
            run.enter(RunStage::Summarizing);
            Some(self.summarizer.summarize(&transcript.text)?)
        } else {
            if wants_summary {
                tracing::info!(run = %run.id(), "empty transcript, skipping summary");
            }
            None
        };

        Ok(RunOutput {
            transcript,
            summary,
        })
    }

    fn notify(&self, run: &PipelineRun, progress: &dyn ProgressNotifier, stage: ProgressStage) {
        if let Err(e) = progress.notify(stage) {
            tracing::warn!(run = %run.id(), stage = ?stage, error = %e, "progress notification dropped");
        }
    }
}
