//! Chat-completions provider for GPT4All and other OpenAI-compatible servers.

pub mod chat_completions;
pub mod shared;

pub use chat_completions::{
    API_KEY_ENV, BASE_URL_ENV, ChatCompletionsClient, ChatCompletionsConfig, ChatReply,
    DEFAULT_BASE_URL,
};
pub use shared::{
    ChatMessage, ProviderError, ProviderErrorKind, ProviderResult, TextDeltaStream,
    normalize_base_url, resolve_api_key, resolve_base_url,
};
