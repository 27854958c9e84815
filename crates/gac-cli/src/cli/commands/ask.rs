//! Single-prompt commands: `ask`, `suggest`, `explain` and `-a`.

use anyhow::{Result, bail};
use gac_core::config::Config;
use gac_core::core::interrupt::InterruptedError;
use gac_core::prompts::{self, PromptMode};
use gac_core::providers::{ChatCompletionsClient, ChatCompletionsConfig, ChatMessage};
use tracing::debug;

use crate::modes;

pub async fn run(mode: PromptMode, words: &[String], config: &Config) -> Result<()> {
    let prompt = words.join(" ");
    if prompt.trim().is_empty() {
        bail!("Missing prompt for {mode}");
    }

    let messages = build_messages(mode, prompt, config.detailed_suggest);
    let client = ChatCompletionsClient::new(ChatCompletionsConfig::from_config(config)?);
    debug!(%mode, model = %client.config().model, "single prompt");

    let outcome = modes::exec::run_turn(&client, &messages, config).await?;
    if outcome.interrupted {
        return Err(InterruptedError.into());
    }
    modes::exec::finish_reply(&outcome.text, config)
}

fn build_messages(mode: PromptMode, prompt: String, detailed_suggest: bool) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = prompts::system_prompt(mode, detailed_suggest) {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_lead_with_system_prompt() {
        let messages = build_messages(PromptMode::Suggest, "list files".to_string(), false);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "list files");
    }
}
