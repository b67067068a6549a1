//! Recognized video-link grammar.
//!
//! Only the canonical watch, short, and shorts URL forms of the one
//! supported video platform are accepted. Everything else is rejected
//! before any subprocess sees the string.

use url::Url;

/// Check a candidate video link against the recognized grammar.
///
/// The scheme may be omitted; extra query parameters are ignored.
pub fn is_recognized_video_url(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = match Url::parse(&candidate) {
        Ok(url) => url,
        Err(_) => return false,
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    let host = match parsed.host_str() {
        Some(host) => host,
        None => return false,
    };

    match host {
        "youtube.com" | "www.youtube.com" => {
            let path = parsed.path();
            if path == "/watch" {
                parsed
                    .query_pairs()
                    .any(|(key, value)| key == "v" && is_video_id(&value))
            } else if let Some(id) = path.strip_prefix("/shorts/") {
                is_video_id(id.trim_end_matches('/'))
            } else {
                false
            }
        }
        "youtu.be" => is_video_id(parsed.path().trim_start_matches('/').trim_end_matches('/')),
        _ => false,
    }
}

fn is_video_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
