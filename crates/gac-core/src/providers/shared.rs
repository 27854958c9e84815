//! Types and helpers shared by the chat-completions client.

use std::fmt;

use anyhow::{Context, Result};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User-Agent header sent with every request.
pub const USER_AGENT: &str = concat!("gac/", env!("CARGO_PKG_VERSION"));

/// Hint appended to connection failures.
pub const UNREACHABLE_HINT: &str = "Is GPT4All running and reachable?";

// ============================================================================
// Config resolution helpers
// ============================================================================

/// Resolves an optional API key with precedence: config > env.
///
/// Blank values count as unset. Local servers need no key, so a missing key
/// is `None` rather than an error.
pub fn resolve_api_key(config_api_key: Option<&str>, env_var: &str) -> Option<String> {
    if let Some(key) = config_api_key {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    std::env::var(env_var)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen env or config value is not a valid URL.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}

/// Strips one trailing `/` and appends `/v1` unless already present.
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.strip_suffix('/').unwrap_or(base_url);
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

/// A chat message in `OpenAI` wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Categories of provider errors for consistent error handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Connection failure or request timeout
    Timeout,
    /// Failed to parse response (JSON parse error, invalid SSE, etc.)
    Parse,
    /// Error object returned by the server mid-stream
    ApiError,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::HttpStatus => write!(f, "http_status"),
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::Parse => write!(f, "parse"),
            ProviderErrorKind::ApiError => write!(f, "api_error"),
        }
    }
}

/// Structured error from the server with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Raw error body, when there is one
    pub details: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, lifting `error.message` out of a JSON body.
    pub fn http_status(status: u16, body: &str) -> Self {
        if body.is_empty() {
            return Self::new(ProviderErrorKind::HttpStatus, format!("HTTP {status}"));
        }

        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(msg) = json
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        {
            return Self {
                kind: ProviderErrorKind::HttpStatus,
                message: format!("HTTP {status}: {msg}"),
                details: Some(body.to_string()),
            };
        }

        Self {
            kind: ProviderErrorKind::HttpStatus,
            message: format!("HTTP {status}: {}", body.trim()),
            details: Some(body.to_string()),
        }
    }

    /// Creates a connection/timeout error carrying the reachability hint.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(
            ProviderErrorKind::Timeout,
            format!("{} {UNREACHABLE_HINT}", message.into()),
        )
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Parse, message)
    }

    /// Creates an API error (from a mid-stream error object).
    pub fn api_error(error_type: &str, message: &str) -> Self {
        Self::new(ProviderErrorKind::ApiError, format!("{error_type}: {message}"))
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Result type for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Boxed stream of reply text deltas.
pub type TextDeltaStream = BoxStream<'static, ProviderResult<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:4891"),
            "http://localhost:4891/v1"
        );
        assert_eq!(
            normalize_base_url("http://localhost:4891/"),
            "http://localhost:4891/v1"
        );
        assert_eq!(
            normalize_base_url("http://localhost:4891/v1/"),
            "http://localhost:4891/v1"
        );
    }

    #[test]
    fn test_http_status_extracts_json_message() {
        let err = ProviderError::http_status(404, r#"{"error":{"message":"no such model"}}"#);
        assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
        assert_eq!(err.to_string(), "HTTP 404: no such model");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_with_plain_body() {
        let err = ProviderError::http_status(500, "boom\n");
        assert_eq!(err.to_string(), "HTTP 500: boom");
        assert_eq!(ProviderError::http_status(502, "").to_string(), "HTTP 502");
    }

    #[test]
    fn test_timeout_carries_hint() {
        let err = ProviderError::timeout("Connection failed.");
        assert_eq!(err.kind, ProviderErrorKind::Timeout);
        assert!(err.to_string().ends_with(UNREACHABLE_HINT));
    }

    #[test]
    fn test_resolve_base_url_falls_back_to_default() {
        let url = resolve_base_url(None, "GAC_TEST_UNSET_BASE_URL", "http://localhost:4891").unwrap();
        assert_eq!(url, "http://localhost:4891");
    }

    #[test]
    fn test_resolve_base_url_rejects_invalid_config() {
        let err = resolve_base_url(Some("not a url"), "GAC_TEST_UNSET_BASE_URL", "http://x").unwrap_err();
        assert!(err.to_string().contains("Invalid base URL"));
    }

    #[test]
    fn test_resolve_api_key_prefers_config_and_ignores_blank() {
        assert_eq!(
            resolve_api_key(Some(" sk-1 "), "GAC_TEST_UNSET_API_KEY"),
            Some("sk-1".to_string())
        );
        assert_eq!(resolve_api_key(Some("  "), "GAC_TEST_UNSET_API_KEY"), None);
    }
}
