//! Per-run bookkeeping.

use chrono::{DateTime, Local};
use uuid::Uuid;

/// Stages a pipeline run moves through.
///
/// `Admitted` is entered only once a concurrency slot is held; every
/// component error transitions directly to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Admitted,
    Acquiring,
    Normalizing,
    Transcribing,
    Summarizing,
    Completed,
    Failed,
}

impl RunStage {
    pub fn name(self) -> &'static str {
        match self {
            RunStage::Admitted => "admitted",
            RunStage::Acquiring => "acquiring",
            RunStage::Normalizing => "normalizing",
            RunStage::Transcribing => "transcribing",
            RunStage::Summarizing => "summarizing",
            RunStage::Completed => "completed",
            RunStage::Failed => "failed",
        }
    }
}

/// One end-to-end execution of the ingestion sequence for a single media
/// reference.
pub struct PipelineRun {
    id: String,
    /// Owning chat/session identifier; opaque, used only in logs.
    session: String,
    stage: RunStage,
    started_at: DateTime<Local>,
}

impl PipelineRun {
    pub(crate) fn admitted(session: impl Into<String>) -> Self {
        let run = Self {
            id: Uuid::new_v4().to_string(),
            session: session.into(),
            stage: RunStage::Admitted,
            started_at: Local::now(),
        };
        tracing::info!(run = %run.id, session = %run.session, "run admitted");
        run
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub(crate) fn enter(&mut self, stage: RunStage) {
        tracing::debug!(
            run = %self.id,
            from = self.stage.name(),
            to = stage.name(),
            "stage transition"
        );
        self.stage = stage;
    }

    pub(crate) fn finish(&mut self, failed: bool) {
        self.stage = if failed {
            RunStage::Failed
        } else {
            RunStage::Completed
        };
        let elapsed = Local::now().signed_duration_since(self.started_at);
        tracing::info!(
            run = %self.id,
            session = %self.session,
            outcome = self.stage.name(),
            elapsed_ms = elapsed.num_milliseconds(),
            "run finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_get_unique_ids() {
        let a = PipelineRun::admitted("chat-1");
        let b = PipelineRun::admitted("chat-1");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.stage(), RunStage::Admitted);
    }

    #[test]
    fn finish_sets_terminal_stage() {
        let mut run = PipelineRun::admitted("chat-2");
        run.enter(RunStage::Acquiring);
        run.finish(false);
        assert_eq!(run.stage(), RunStage::Completed);

        let mut failed = PipelineRun::admitted("chat-2");
        failed.enter(RunStage::Transcribing);
        failed.finish(true);
        assert_eq!(failed.stage(), RunStage::Failed);
    }
}
