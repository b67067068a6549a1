//! Serde mirrors of the remote providers' wire format.
//!
//! Both the transcription and the chat-completion endpoints embed the same
//! error object shape in their JSON bodies, so one detail type reports both
//! uniformly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error object embedded in a provider's JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
}

impl fmt::Display for ProviderErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        let mut extras = Vec::new();
        if let Some(kind) = &self.kind {
            extras.push(format!("type: {kind}"));
        }
        if let Some(code) = &self.code {
            extras.push(format!("code: {code}"));
        }
        if let Some(param) = &self.param {
            extras.push(format!("param: {param}"));
        }
        if !extras.is_empty() {
            write!(f, " ({})", extras.join(", "))?;
        }
        Ok(())
    }
}

/// Body returned by the transcription endpoint.
#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub error: Option<ProviderErrorDetail>,
}

/// Single-message request body for the chat-completion endpoint.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body returned by the chat-completion endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcription_response_parses_empty_text() {
        let parsed: TranscriptionResponse = serde_json::from_str(r#"{"text": ""}"#).unwrap();
        assert_eq!(parsed.text, "");
        assert!(parsed.error.is_none());
    }

    #[test]
    fn transcription_response_parses_error_payload() {
        let body = r#"{"error": {"message": "invalid audio", "type": "invalid_request_error", "code": "bad_file"}}"#;
        let parsed: TranscriptionResponse = serde_json::from_str(body).unwrap();
        let detail = parsed.error.unwrap();
        assert_eq!(detail.message, "invalid audio");
        assert_eq!(detail.kind.as_deref(), Some("invalid_request_error"));
        assert_eq!(detail.code.as_deref(), Some("bad_file"));
        assert!(detail.param.is_none());
    }

    #[test]
    fn error_detail_display_includes_present_fields_only() {
        let detail = ProviderErrorDetail {
            message: "quota exceeded".to_string(),
            kind: Some("rate_limit".to_string()),
            code: None,
            param: None,
        };
        assert_eq!(detail.to_string(), "quota exceeded (type: rate_limit)");

        let bare = ProviderErrorDetail {
            message: "oops".to_string(),
            kind: None,
            code: None,
            param: None,
        };
        assert_eq!(bare.to_string(), "oops");
    }

    #[test]
    fn completion_response_parses_choices() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "a summary"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(parsed.choices[0].message.content, "a summary");
    }

    #[test]
    fn completion_request_serializes_messages() {
        let request = ChatCompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Tell me about Fiji".to_string(),
            }],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""model":"gpt-4o""#));
        assert!(json.contains(r#""role":"user""#));
    }
}
