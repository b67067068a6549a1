//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field carries a serde default so a partial file loads cleanly.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Storage locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// Remote provider endpoints and credentials.
    #[serde(default)]
    pub providers: ProviderSettings,

    /// Pipeline limits and timeouts.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Storage locations for transient files and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Working root for voice downloads and normalized audio.
    #[serde(default = "default_work_root")]
    pub work_root: String,

    /// Root for extractor outputs. Kept separate from the working root
    /// because the extraction subprocess names its own files here.
    #[serde(default = "default_extract_root")]
    pub extract_root: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Session-cookie file handed to the media extractor for sites that
    /// require an authenticated session. Empty means unset.
    #[serde(default)]
    pub cookies_file: String,
}

fn default_work_root() -> String {
    ".voicebrief/work".to_string()
}

fn default_extract_root() -> String {
    ".voicebrief/upload".to_string()
}

fn default_logs_folder() -> String {
    ".voicebrief/logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_root: default_work_root(),
            extract_root: default_extract_root(),
            logs_folder: default_logs_folder(),
            cookies_file: String::new(),
        }
    }
}

impl PathSettings {
    /// Configured cookies file, if any.
    pub fn cookies_path(&self) -> Option<PathBuf> {
        if self.cookies_file.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.cookies_file))
        }
    }
}

/// Remote provider endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Speech-to-text endpoint.
    #[serde(default = "default_transcription_url")]
    pub transcription_url: String,

    /// Chat-completion endpoint used for summaries.
    #[serde(default = "default_completion_url")]
    pub completion_url: String,

    /// Bearer token for both endpoints. Overridable via
    /// `VOICEBRIEF_API_TOKEN`.
    #[serde(default)]
    pub api_token: String,

    /// Model identifier sent with transcription uploads.
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// Model identifier for summary requests.
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Language summaries are written in.
    #[serde(default = "default_summary_language")]
    pub summary_language: String,

    /// URL template the attachment fetcher substitutes `{id}` into.
    /// Empty means the transport supplies its own fetcher.
    #[serde(default)]
    pub attachment_url_template: String,
}

fn default_transcription_url() -> String {
    "https://bothub.chat/api/v2/openai/v1/audio/transcriptions".to_string()
}

fn default_completion_url() -> String {
    "https://bothub.chat/api/v2/openai/v1/chat/completions".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_summary_model() -> String {
    "gpt-4o".to_string()
}

fn default_summary_language() -> String {
    "English".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            transcription_url: default_transcription_url(),
            completion_url: default_completion_url(),
            api_token: String::new(),
            transcription_model: default_transcription_model(),
            summary_model: default_summary_model(),
            summary_language: default_summary_language(),
            attachment_url_template: String::new(),
        }
    }
}

/// Pipeline limits and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Maximum number of runs allowed past admission at once.
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,

    /// Timeout for downloading a voice attachment.
    #[serde(default = "default_attachment_timeout_secs")]
    pub attachment_timeout_secs: u64,

    /// Timeout for the transcription call. Generous, to tolerate large
    /// files.
    #[serde(default = "default_transcription_timeout_secs")]
    pub transcription_timeout_secs: u64,

    /// Timeout for the summary call. Long, to tolerate large-model latency.
    #[serde(default = "default_summary_timeout_secs")]
    pub summary_timeout_secs: u64,

    /// Wall-clock deadline for each external tool invocation; the child is
    /// killed on expiry.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_max_concurrent_runs() -> usize {
    10
}

fn default_attachment_timeout_secs() -> u64 {
    30
}

fn default_transcription_timeout_secs() -> u64 {
    60
}

fn default_summary_timeout_secs() -> u64 {
    120
}

fn default_tool_timeout_secs() -> u64 {
    600
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_runs: default_max_concurrent_runs(),
            attachment_timeout_secs: default_attachment_timeout_secs(),
            transcription_timeout_secs: default_transcription_timeout_secs(),
            summary_timeout_secs: default_summary_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl PipelineSettings {
    pub fn attachment_timeout(&self) -> Duration {
        Duration::from_secs(self.attachment_timeout_secs)
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_secs)
    }

    pub fn summary_timeout(&self) -> Duration {
        Duration::from_secs(self.summary_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write a rolling log file under the logs folder.
    #[serde(default)]
    pub log_to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_to_file: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.pipeline.max_concurrent_runs, 10);
        assert_eq!(settings.providers.transcription_model, "whisper-1");
        assert!(settings.paths.cookies_path().is_none());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let settings: Settings =
            toml::from_str("[pipeline]\nmax_concurrent_runs = 3\n").unwrap();
        assert_eq!(settings.pipeline.max_concurrent_runs, 3);
        assert_eq!(settings.pipeline.tool_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn cookies_path_set_when_configured() {
        let mut paths = PathSettings::default();
        paths.cookies_file = "/tmp/cookies.txt".to_string();
        assert_eq!(paths.cookies_path(), Some(PathBuf::from("/tmp/cookies.txt")));
    }
}
