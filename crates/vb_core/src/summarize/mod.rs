//! Transcript summarization through a chat-completion provider.
//!
//! Used only by the video-link flow. The transcript is wrapped in an
//! instruction prompt asking for a concise synopsis in the configured
//! output language.

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::Settings;
use crate::models::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ProviderErrorDetail,
};

/// Errors from the summarization stage.
#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("summary request failed: {0}")]
    Transport(String),

    #[error("summary provider error: {0}")]
    Provider(ProviderErrorDetail),

    #[error("malformed summary response: {detail}")]
    MalformedResponse { detail: String },

    #[error("summary response contained no choices")]
    NoChoices,
}

/// Seam for the summary provider.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, transcript: &str) -> Result<String, SummarizeError>;
}

/// Production summarizer posting to the configured chat-completion endpoint.
pub struct HttpSummarizer {
    http: reqwest::blocking::Client,
    endpoint: String,
    token: String,
    model: String,
    language: String,
}

impl HttpSummarizer {
    pub fn new(settings: &Settings) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::blocking::Client::builder()
                .timeout(settings.pipeline.summary_timeout())
                .build()?,
            endpoint: settings.providers.completion_url.clone(),
            token: settings.providers.api_token.clone(),
            model: settings.providers.summary_model.clone(),
            language: settings.providers.summary_language.clone(),
        })
    }
}

impl Summarizer for HttpSummarizer {
    fn summarize(&self, transcript: &str) -> Result<String, SummarizeError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(&self.language, transcript),
            }],
        };

        tracing::info!(
            model = %self.model,
            transcript_chars = transcript.len(),
            "requesting summary"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .map_err(|e| SummarizeError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SummarizeError::Transport(e.to_string()))?;

        let summary = decode_response(status, &body)?;
        tracing::info!(chars = summary.len(), "summary received");
        Ok(summary)
    }
}

fn build_prompt(language: &str, transcript: &str) -> String {
    format!(
        "Analyze the following text, which was extracted from the audio track \
         of a video, and provide a concise summary of its key points. \
         Answer in {language}.\n\n\"{transcript}\""
    )
}

/// Decode the provider's response body according to its status.
fn decode_response(status: StatusCode, body: &str) -> Result<String, SummarizeError> {
    if !status.is_success() {
        if let Ok(parsed) = serde_json::from_str::<ChatCompletionResponse>(body) {
            if let Some(detail) = parsed.error {
                return Err(SummarizeError::Provider(detail));
            }
        }
        return Err(SummarizeError::Transport(format!(
            "status {status}: {body}"
        )));
    }

    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| SummarizeError::MalformedResponse {
            detail: e.to_string(),
        })?;

    if let Some(detail) = parsed.error {
        return Err(SummarizeError::Provider(detail));
    }

    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .unwrap_or_default();

    if content.is_empty() {
        return Err(SummarizeError::NoChoices);
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_language_and_transcript() {
        let prompt = build_prompt("Russian", "the talk was about sailing");
        assert!(prompt.contains("Answer in Russian"));
        assert!(prompt.contains("the talk was about sailing"));
    }

    #[test]
    fn first_choice_content_is_returned() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "a synopsis"}}]}"#;
        assert_eq!(decode_response(StatusCode::OK, body).unwrap(), "a synopsis");
    }

    #[test]
    fn zero_choices_is_no_choices() {
        let err = decode_response(StatusCode::OK, r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, SummarizeError::NoChoices));
    }

    #[test]
    fn empty_content_is_no_choices() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": ""}}]}"#;
        let err = decode_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, SummarizeError::NoChoices));
    }

    #[test]
    fn embedded_error_wins_over_choices() {
        let body = r#"{"choices": [], "error": {"message": "billing hard limit reached"}}"#;
        let err = decode_response(StatusCode::OK, body).unwrap_err();

        match err {
            SummarizeError::Provider(detail) => {
                assert_eq!(detail.message, "billing hard limit reached");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_status_with_error_body_surfaces_provider_message() {
        let body = r#"{"error": {"message": "model not found", "type": "invalid_request_error", "param": "model"}}"#;
        let err = decode_response(StatusCode::NOT_FOUND, body).unwrap_err();

        match err {
            SummarizeError::Provider(detail) => {
                assert_eq!(detail.message, "model not found");
                assert_eq!(detail.param.as_deref(), Some("model"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unparseable_ok_body_is_malformed() {
        let err = decode_response(StatusCode::OK, "quota page").unwrap_err();
        assert!(matches!(err, SummarizeError::MalformedResponse { .. }));
    }
}
