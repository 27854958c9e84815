//! Line-based interactive chat.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use gac_core::config::Config;
use gac_core::core::interrupt;
use gac_core::prompts::{self, PromptMode};
use gac_core::providers::{ChatCompletionsClient, ChatCompletionsConfig, ChatMessage};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::exec;

const USER_PROMPT: &str = "You> ";
const REPLY_PROMPT: &str = "A.I> ";
const BANNER: &str = "Interactive chat. Type \"exit\" to quit.";

/// Runs the chat loop until `exit`, `quit`, end of input or Ctrl+C at the
/// input prompt.
///
/// # Errors
/// Returns an error if the client cannot be configured or the terminal
/// cannot be read or written.
pub async fn run_interactive_chat(config: &Config) -> Result<()> {
    let client = ChatCompletionsClient::new(ChatCompletionsConfig::from_config(config)?);
    info!(model = %client.config().model, "chat started");

    let mut history = initial_history(config);
    let mut lines = spawn_stdin_reader();

    println!("{BANNER}");

    loop {
        write_prompt(USER_PROMPT)?;

        let line = tokio::select! {
            biased;
            () = interrupt::wait_for_interrupt() => None,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            println!();
            println!("Bye.");
            return Ok(());
        };

        let line = line.context("read input")?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("Bye.");
            return Ok(());
        }

        history.push(ChatMessage::user(input));
        write_prompt(REPLY_PROMPT)?;

        let outcome = match exec::run_turn(&client, &history, config).await {
            Ok(outcome) => outcome,
            Err(err) => {
                history.pop();
                println!();
                eprintln!("{err:#}");
                warn!(error = %format!("{err:#}"), "chat turn failed");
                continue;
            }
        };

        if outcome.interrupted {
            // the partial reply is dropped along with its question
            history.pop();
            interrupt::reset();
            println!();
            continue;
        }

        exec::finish_reply(&outcome.text, config)?;
        history.push(ChatMessage::assistant(outcome.text));
    }
}

/// The conversation before the first question: the chat system prompt, if
/// there is one.
fn initial_history(config: &Config) -> Vec<ChatMessage> {
    prompts::system_prompt(PromptMode::Chat, config.detailed_suggest)
        .map(ChatMessage::system)
        .into_iter()
        .collect()
}

fn write_prompt(prompt: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(prompt.as_bytes())
        .and_then(|()| out.flush())
        .context("write prompt")
}

/// Reads stdin on a plain thread so input never blocks the runtime.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_starts_without_system_prompt() {
        assert!(initial_history(&Config::default()).is_empty());
    }
}
