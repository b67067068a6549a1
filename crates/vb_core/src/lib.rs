//! VoiceBrief Core - media-ingestion pipeline for chat transcription
//!
//! Turns voice notes and video links into transcripts and optional
//! summaries. This crate contains the pipeline and its collaborator seams
//! with zero chat-transport dependencies; the transport (or the CLI crate)
//! drives it through [`orchestrator::Orchestrator`].

pub mod acquire;
pub mod artifacts;
pub mod config;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod summarize;
pub mod tools;
pub mod transcribe;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
