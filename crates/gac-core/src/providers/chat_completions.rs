//! OpenAI-compatible Chat Completions client (GPT4All local server and friends).

use std::pin::Pin;

use anyhow::Result;
use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::providers::shared::{
    ChatMessage, ProviderError, ProviderErrorKind, ProviderResult, TextDeltaStream, USER_AGENT,
    normalize_base_url, resolve_api_key, resolve_base_url,
};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const MODELS_PATH: &str = "/models";

pub const DEFAULT_BASE_URL: &str = "http://localhost:4891";
pub const BASE_URL_ENV: &str = "GAC_BASE_URL";
pub const API_KEY_ENV: &str = "GAC_API_KEY";

/// Chat completions client configuration.
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    /// Server root; `/v1` is appended when missing.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stream: bool,
}

impl ChatCompletionsConfig {
    /// Builds the client configuration from the loaded config and environment.
    ///
    /// # Errors
    /// Returns an error if the resolved base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = resolve_base_url(config.base_url.as_deref(), BASE_URL_ENV, DEFAULT_BASE_URL)?;
        Ok(Self {
            base_url,
            model: config.model.clone(),
            api_key: resolve_api_key(config.api_key.as_deref(), API_KEY_ENV),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: config.stream,
        })
    }
}

/// A reply to a chat request: streamed deltas or the whole text at once.
pub enum ChatReply {
    Stream(TextDeltaStream),
    Complete(String),
}

impl std::fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatReply::Stream(_) => f.write_str("ChatReply::Stream(..)"),
            ChatReply::Complete(text) => f.debug_tuple("ChatReply::Complete").field(text).finish(),
        }
    }
}

/// OpenAI-compatible chat completions client.
pub struct ChatCompletionsClient {
    config: ChatCompletionsConfig,
    http: reqwest::Client,
}

impl ChatCompletionsClient {
    pub fn new(config: ChatCompletionsConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ChatCompletionsConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", normalize_base_url(&self.config.base_url))
    }

    /// Lists the model ids the server offers.
    ///
    /// # Errors
    /// Returns a `ProviderError` on connection failure, non-success status or
    /// an unparseable body.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = self.endpoint(MODELS_PATH);
        debug!(%url, "listing models");

        let response = self
            .http
            .get(&url)
            .headers(build_headers(self.config.api_key.as_deref(), false))
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_reqwest_error)?;
        if !status.is_success() {
            return Err(ProviderError::http_status(status.as_u16(), &body).into());
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|err| ProviderError::parse(format!("Failed to parse models list: {err}")))?;
        Ok(parse_model_ids(&value))
    }

    /// Sends a chat request.
    ///
    /// A streaming request that the server rejects as unsupported is retried
    /// once without streaming.
    ///
    /// # Errors
    /// Returns a `ProviderError` on connection failure, non-success status or
    /// an unparseable body.
    pub async fn send(&self, messages: &[ChatMessage]) -> Result<ChatReply> {
        let url = self.endpoint(CHAT_COMPLETIONS_PATH);
        let request = ChatCompletionRequest::new(&self.config, messages, self.config.stream);
        debug!(%url, model = %request.model, stream = request.stream, "sending chat completion");

        let response = self.post(&url, &request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if request.stream && status == StatusCode::BAD_REQUEST && is_stream_unsupported(&body) {
                info!("server does not support streaming; retrying without it");
                let retry = ChatCompletionRequest {
                    stream: false,
                    ..request
                };
                let response = self.post(&url, &retry).await?;
                return Ok(ChatReply::Complete(read_completion(response).await?));
            }
            return Err(ProviderError::http_status(status.as_u16(), &body).into());
        }

        if request.stream && is_event_stream(response.headers()) {
            let parser = ChatCompletionsSseParser::new(response.bytes_stream());
            return Ok(ChatReply::Stream(Box::pin(parser)));
        }

        Ok(ChatReply::Complete(read_completion(response).await?))
    }

    async fn post(
        &self,
        url: &str,
        request: &ChatCompletionRequest<'_>,
    ) -> ProviderResult<reqwest::Response> {
        self.http
            .post(url)
            .headers(build_headers(self.config.api_key.as_deref(), request.stream))
            .json(request)
            .send()
            .await
            .map_err(classify_reqwest_error)
    }
}

fn build_headers(api_key: Option<&str>, stream: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key
        && let Ok(value) = HeaderValue::from_str(&format!("Bearer {key}"))
    {
        headers.insert(AUTHORIZATION, value);
    }
    let accept = if stream {
        "text/event-stream"
    } else {
        "application/json"
    };
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("user-agent", HeaderValue::from_static(USER_AGENT));
    headers
}

fn classify_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {e}."))
    } else if e.is_connect() {
        ProviderError::timeout(format!("Connection failed: {e}."))
    } else if e.is_decode() || e.is_body() {
        ProviderError::parse(format!("Failed to read response: {e}"))
    } else {
        ProviderError::new(
            ProviderErrorKind::HttpStatus,
            format!("Request error: {e}"),
        )
    }
}

fn is_stream_unsupported(body: &str) -> bool {
    body.contains("stream") && body.contains("not supported")
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"))
}

/// Reads a non-streamed completion body and extracts its text.
async fn read_completion(response: reqwest::Response) -> ProviderResult<String> {
    let status = response.status();
    let body = response.text().await.map_err(classify_reqwest_error)?;
    if !status.is_success() {
        return Err(ProviderError::http_status(status.as_u16(), &body));
    }

    let value: Value = serde_json::from_str(&body)
        .map_err(|err| ProviderError::parse(format!("Failed to parse completion JSON: {err}")))?;
    if let Some(error) = value.get("error") {
        return Err(error_object(error));
    }
    Ok(content_delta(&value).to_string())
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

impl<'a> ChatCompletionRequest<'a> {
    fn new(config: &'a ChatCompletionsConfig, messages: &'a [ChatMessage], stream: bool) -> Self {
        Self {
            model: &config.model,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream,
        }
    }
}

/// Text carried by a completion or chunk object.
///
/// Looks at `delta.content`, then `message.content`, then `text` of the
/// first choice; anything else is empty.
pub fn content_delta(value: &Value) -> &str {
    let Some(choice) = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    else {
        return "";
    };

    non_empty(choice.get("delta").and_then(|d| d.get("content")))
        .or_else(|| non_empty(choice.get("message").and_then(|m| m.get("content"))))
        .or_else(|| non_empty(choice.get("text")))
        .unwrap_or("")
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn parse_model_ids(value: &Value) -> Vec<String> {
    value
        .get("data")
        .and_then(Value::as_array)
        .map(|models| {
            models
                .iter()
                .filter_map(|model| model.get("id").and_then(Value::as_str))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn error_object(error: &Value) -> ProviderError {
    let error_type = error.get("type").and_then(Value::as_str).unwrap_or("error");
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error");
    ProviderError::api_error(error_type, message)
}

/// Appends a blank line when the inner stream ends so a final event that
/// lacks its terminating blank line is still dispatched.
struct SseTerminatedStream<S> {
    inner: S,
    emitted_terminator: bool,
}

impl<S> SseTerminatedStream<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            emitted_terminator: false,
        }
    }
}

impl<S, E> Stream for SseTerminatedStream<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
{
    type Item = std::result::Result<bytes::Bytes, E>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        if self.emitted_terminator {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item)),
            Poll::Ready(None) => {
                self.emitted_terminator = true;
                Poll::Ready(Some(Ok(bytes::Bytes::from_static(b"\n\n"))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// SSE parser yielding the text delta of each chunk.
struct ChatCompletionsSseParser<S> {
    inner: EventStream<SseTerminatedStream<S>>,
    done: bool,
}

impl<S> ChatCompletionsSseParser<S> {
    fn new<E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    {
        Self {
            inner: SseTerminatedStream::new(stream).eventsource(),
            done: false,
        }
    }

    /// `Ok(None)` means the payload carries no text.
    fn handle_event_data(&mut self, data: &str) -> ProviderResult<Option<String>> {
        let trimmed = data.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed == "[DONE]" {
            self.done = true;
            return Ok(None);
        }

        let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
            debug!(payload = trimmed, "skipping non-JSON SSE payload");
            return Ok(None);
        };

        if let Some(error) = value.get("error") {
            self.done = true;
            return Err(error_object(error));
        }

        let text = content_delta(&value);
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

impl<S, E> Stream for ChatCompletionsSseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ProviderResult<String>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        loop {
            if self.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => match self.handle_event_data(&event.data) {
                    Ok(Some(text)) => return Poll::Ready(Some(Ok(text))),
                    Ok(None) => {}
                    Err(err) => return Poll::Ready(Some(Err(err))),
                },
                Poll::Ready(Some(Err(e))) => {
                    warn!(error = %e, "SSE stream error");
                    self.done = true;
                    return Poll::Ready(Some(Err(ProviderError::parse(format!(
                        "SSE stream error: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    self.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use serde_json::json;

    use super::*;

    fn byte_stream(
        chunks: &[&str],
    ) -> impl Stream<Item = std::result::Result<bytes::Bytes, std::io::Error>> + Unpin {
        let owned: Vec<_> = chunks
            .iter()
            .map(|c| Ok(bytes::Bytes::from(c.to_string())))
            .collect();
        futures_util::stream::iter(owned)
    }

    async fn collect(chunks: &[&str]) -> Vec<ProviderResult<String>> {
        ChatCompletionsSseParser::new(byte_stream(chunks))
            .collect()
            .await
    }

    fn delta(text: &str) -> String {
        format!(
            "data: {}\n\n",
            json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    #[tokio::test]
    async fn test_sse_deltas_in_order_until_done() {
        let first = delta("Hel");
        let second = delta("lo");
        let after = delta("ignored");
        let events = collect(&[&first, &second, "data: [DONE]\n\n", &after]).await;
        let texts: Vec<String> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(texts, ["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_sse_event_split_across_chunks() {
        let whole = delta("split");
        let (a, b) = whole.split_at(10);
        let texts: Vec<String> = collect(&[a, b]).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(texts, ["split"]);
    }

    #[tokio::test]
    async fn test_sse_final_event_without_blank_line() {
        let last = delta("end");
        let texts: Vec<String> = collect(&[last.trim_end()])
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(texts, ["end"]);
    }

    #[tokio::test]
    async fn test_sse_skips_non_json_and_empty_deltas() {
        let role_only = format!(
            "data: {}\n\n",
            json!({"choices": [{"delta": {"role": "assistant"}}]})
        );
        let text = delta("ok");
        let events = collect(&["data: keep-alive\n\n", &role_only, &text]).await;
        let texts: Vec<String> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(texts, ["ok"]);
    }

    #[tokio::test]
    async fn test_sse_error_object_ends_stream() {
        let error = format!(
            "data: {}\n\n",
            json!({"error": {"type": "overloaded", "message": "busy"}})
        );
        let more = delta("never");
        let events = collect(&[&error, &more]).await;
        assert_eq!(events.len(), 1);
        let err = events.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::ApiError);
        assert_eq!(err.message, "overloaded: busy");
    }

    #[test]
    fn test_content_delta_fallbacks() {
        assert_eq!(
            content_delta(&json!({"choices": [{"delta": {"content": "d"}}]})),
            "d"
        );
        assert_eq!(
            content_delta(&json!({"choices": [{"message": {"content": "m"}}]})),
            "m"
        );
        assert_eq!(content_delta(&json!({"choices": [{"text": "t"}]})), "t");
        assert_eq!(
            content_delta(&json!({"choices": [{"delta": {"content": ""}, "text": "t"}]})),
            "t"
        );
        assert_eq!(content_delta(&json!({"choices": []})), "");
        assert_eq!(content_delta(&json!({})), "");
    }

    #[test]
    fn test_parse_model_ids() {
        let value = json!({"data": [{"id": "llama"}, {"id": ""}, {"name": "x"}, {"id": "phi"}]});
        assert_eq!(parse_model_ids(&value), ["llama", "phi"]);
        assert!(parse_model_ids(&json!({"object": "list"})).is_empty());
    }

    #[test]
    fn test_stream_unsupported_detection() {
        assert!(is_stream_unsupported(
            r#"{"error":{"message":"stream mode is not supported"}}"#
        ));
        assert!(!is_stream_unsupported("stream failed"));
        assert!(!is_stream_unsupported("not supported"));
    }

    #[test]
    fn test_request_body_shape() {
        let config = ChatCompletionsConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt4all".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 512,
            stream: true,
        };
        let messages = [ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let body = serde_json::to_value(ChatCompletionRequest::new(&config, &messages, true)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt4all",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.7,
                "max_tokens": 512,
                "stream": true
            })
        );
    }

    #[test]
    fn test_headers_include_bearer_only_with_key() {
        let with_key = build_headers(Some("sk-test"), true);
        assert_eq!(with_key.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
        assert_eq!(with_key.get(ACCEPT).unwrap(), "text/event-stream");

        let without = build_headers(None, false);
        assert!(without.get(AUTHORIZATION).is_none());
        assert_eq!(without.get(ACCEPT).unwrap(), "application/json");
    }
}
