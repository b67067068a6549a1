//! Speech-to-text submission.
//!
//! One multipart upload per artifact, no retries: a single failed attempt
//! terminates the run. An empty transcript with no embedded provider error
//! is silence, not failure.

use std::io;

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::Settings;
use crate::models::{Artifact, ProviderErrorDetail, Transcript, TranscriptionResponse};

/// Errors from the transcription stage.
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("transcription request failed: {0}")]
    Transport(String),

    #[error("transcription provider error: {0}")]
    Provider(ProviderErrorDetail),

    #[error("malformed transcription response: {detail}")]
    MalformedResponse { detail: String },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

/// Seam for the speech-to-text provider.
pub trait SpeechToText: Send + Sync {
    fn transcribe(&self, audio: &Artifact) -> Result<Transcript, TranscribeError>;
}

/// Production transcriber posting to the configured HTTP endpoint.
pub struct HttpTranscriber {
    http: reqwest::blocking::Client,
    endpoint: String,
    token: String,
    model: String,
}

impl HttpTranscriber {
    pub fn new(settings: &Settings) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::blocking::Client::builder()
                .timeout(settings.pipeline.transcription_timeout())
                .build()?,
            endpoint: settings.providers.transcription_url.clone(),
            token: settings.providers.api_token.clone(),
            model: settings.providers.transcription_model.clone(),
        })
    }
}

impl SpeechToText for HttpTranscriber {
    fn transcribe(&self, audio: &Artifact) -> Result<Transcript, TranscribeError> {
        tracing::info!(
            file = %audio.path().display(),
            model = %self.model,
            "submitting audio for transcription"
        );

        let form = reqwest::blocking::multipart::Form::new()
            .file("file", audio.path())
            .map_err(|e| TranscribeError::Io {
                operation: "reading audio artifact".to_string(),
                source: e,
            })?
            .text("model", self.model.clone());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .map_err(|e| TranscribeError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TranscribeError::Transport(e.to_string()))?;

        let transcript = decode_response(status, &body)?;
        tracing::info!(chars = transcript.text.len(), "transcription completed");
        Ok(transcript)
    }
}

/// Decode the provider's response body according to its status.
fn decode_response(status: StatusCode, body: &str) -> Result<Transcript, TranscribeError> {
    if !status.is_success() {
        // A non-2xx body often still carries the provider's error object;
        // prefer its message over a bare status line.
        if let Ok(parsed) = serde_json::from_str::<TranscriptionResponse>(body) {
            if let Some(detail) = parsed.error {
                return Err(TranscribeError::Provider(detail));
            }
        }
        return Err(TranscribeError::Transport(format!(
            "status {status}: {body}"
        )));
    }

    let parsed: TranscriptionResponse =
        serde_json::from_str(body).map_err(|e| TranscribeError::MalformedResponse {
            detail: e.to_string(),
        })?;

    if let Some(detail) = parsed.error {
        return Err(TranscribeError::Provider(detail));
    }

    if parsed.text.is_empty() {
        tracing::warn!("provider returned no text, treating as silence");
    }

    Ok(Transcript { text: parsed.text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_with_text_is_success() {
        let transcript =
            decode_response(StatusCode::OK, r#"{"text": "hello world"}"#).unwrap();
        assert_eq!(transcript.text, "hello world");
    }

    #[test]
    fn ok_with_empty_text_is_silence_not_failure() {
        let transcript = decode_response(StatusCode::OK, r#"{"text": ""}"#).unwrap();
        assert!(transcript.is_empty());
    }

    #[test]
    fn ok_with_embedded_error_is_provider_error() {
        let body = r#"{"text": "", "error": {"message": "model overloaded", "type": "server_error"}}"#;
        let err = decode_response(StatusCode::OK, body).unwrap_err();

        match err {
            TranscribeError::Provider(detail) => {
                assert_eq!(detail.message, "model overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ok_with_unparseable_body_is_malformed() {
        let err = decode_response(StatusCode::OK, "<html>busy</html>").unwrap_err();
        assert!(matches!(err, TranscribeError::MalformedResponse { .. }));
    }

    #[test]
    fn error_status_with_error_body_surfaces_provider_message() {
        let body = r#"{"error": {"message": "invalid api key", "type": "auth_error", "code": "401"}}"#;
        let err = decode_response(StatusCode::INTERNAL_SERVER_ERROR, body).unwrap_err();

        match err {
            TranscribeError::Provider(detail) => {
                assert_eq!(detail.message, "invalid api key");
                assert_eq!(detail.kind.as_deref(), Some("auth_error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_status_without_error_body_falls_back_to_status_and_body() {
        let err = decode_response(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();

        match err {
            TranscribeError::Transport(message) => {
                assert!(message.contains("502"));
                assert!(message.contains("upstream down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
