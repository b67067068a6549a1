//! VoiceBrief command-line driver.
//!
//! Stands in for the chat transport: loads configuration, wires the
//! pipeline, and runs one flow per invocation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vb_core::acquire::{
    AttachmentFetcher, AttachmentSource, FetchError, UrlAttachmentFetcher, EXTRACTOR_BIN,
};
use vb_core::config::{ConfigManager, Settings};
use vb_core::normalize::TRANSCODER_BIN;
use vb_core::orchestrator::{NotifyError, Orchestrator, ProgressNotifier, ProgressStage};
use vb_core::tools;

#[derive(Parser)]
#[command(
    name = "voicebrief",
    version,
    about = "Transcribe voice notes and summarize video links"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "voicebrief.toml")]
    config: PathBuf,

    /// Opaque session tag carried into logs.
    #[arg(long, default_value = "cli")]
    session: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe a chat voice attachment by its identifier.
    Voice {
        attachment_id: String,

        /// Known duration of the clip, in seconds.
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Extract, transcribe, and summarize the audio track of a video link.
    Digest { url: String },

    /// Transcribe a local audio file.
    File { path: PathBuf },
}

/// Fetcher for the `file` subcommand: the attachment id is a local path.
struct LocalFileFetcher;

impl AttachmentFetcher for LocalFileFetcher {
    fn resolve(&self, attachment_id: &str) -> Result<AttachmentSource, FetchError> {
        match std::fs::read(attachment_id) {
            Ok(bytes) => Ok(AttachmentSource::Bytes(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(attachment_id.to_string()))
            }
            Err(e) => Err(FetchError::Transport(e.to_string())),
        }
    }
}

/// Prints progress milestones to stdout while a video is processed.
struct ConsoleProgress;

impl ProgressNotifier for ConsoleProgress {
    fn notify(&self, stage: ProgressStage) -> Result<(), NotifyError> {
        match stage {
            ProgressStage::AudioExtracted => println!("Audio extracted, transcribing..."),
            ProgressStage::TranscriptReady => println!("Transcript ready, summarizing..."),
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut manager = ConfigManager::new(&cli.config);
    manager
        .load_or_create()
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    manager.apply_env_overrides();
    manager.ensure_dirs_exist()?;
    let settings = manager.settings().clone();

    let _log_guard = init_tracing(&settings)?;
    check_dependencies(&settings);

    if settings.providers.api_token.is_empty() {
        bail!("no API token configured; set providers.api_token or VOICEBRIEF_API_TOKEN");
    }

    match cli.command {
        Command::Voice {
            attachment_id,
            duration_secs,
        } => {
            if settings.providers.attachment_url_template.is_empty() {
                bail!("providers.attachment_url_template is not configured");
            }
            let fetcher = Arc::new(UrlAttachmentFetcher::new(
                &settings.providers.attachment_url_template,
            ));
            let orchestrator = Orchestrator::from_settings(&settings, fetcher)?;
            let transcript = orchestrator.run_voice(
                &cli.session,
                &attachment_id,
                duration_secs.map(Duration::from_secs),
            )?;
            print_transcript(&transcript.text);
        }

        Command::File { path } => {
            let orchestrator = Orchestrator::from_settings(&settings, Arc::new(LocalFileFetcher))?;
            let transcript =
                orchestrator.run_voice(&cli.session, &path.display().to_string(), None)?;
            print_transcript(&transcript.text);
        }

        Command::Digest { url } => {
            let orchestrator = Orchestrator::from_settings(&settings, Arc::new(LocalFileFetcher))?;
            let digest = orchestrator.run_video(&cli.session, &url, &ConsoleProgress)?;
            match digest.summary {
                Some(summary) => println!("{summary}"),
                None => println!("No speech detected in the video's audio track."),
            }
        }
    }

    Ok(())
}

fn print_transcript(text: &str) {
    if text.trim().is_empty() {
        println!("No speech detected.");
    } else {
        println!("{text}");
    }
}

fn init_tracing(settings: &Settings) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))?;

    if settings.logging.log_to_file {
        let appender =
            tracing_appender::rolling::daily(&settings.paths.logs_folder, "voicebrief.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        Ok(None)
    }
}

/// Warn about missing external binaries up front instead of failing on the
/// first run that needs them.
fn check_dependencies(settings: &Settings) {
    for tool in [EXTRACTOR_BIN, TRANSCODER_BIN] {
        if tools::locate(tool).is_none() {
            tracing::warn!(tool, "not found on PATH; flows depending on it will fail");
        }
    }

    match settings.paths.cookies_path() {
        Some(path) if !path.exists() => {
            tracing::warn!(
                path = %path.display(),
                "cookies file configured but not found; video downloads may be restricted"
            );
        }
        Some(_) => {}
        None => {
            tracing::info!(
                "no cookies file configured; video downloads may fail on sites requiring a session"
            );
        }
    }
}
