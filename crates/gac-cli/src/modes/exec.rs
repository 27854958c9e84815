//! Streaming reply output shared by the single-prompt modes and chat.

use std::io::{self, Write};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use gac_core::config::Config;
use gac_core::core::interrupt;
use gac_core::markdown::{MarkdownRenderer, StreamReassembler};
use gac_core::providers::{ChatCompletionsClient, ChatMessage, ChatReply};
use tracing::debug;

/// What was printed for one reply.
#[derive(Debug)]
pub struct ReplyOutcome {
    /// Raw reply text received before the reply ended or was abandoned.
    pub text: String,
    pub interrupted: bool,
}

/// Renderer for one reply, or `None` when rendering is off.
pub fn renderer_for(config: &Config) -> Option<MarkdownRenderer> {
    config
        .render_markdown
        .then(|| MarkdownRenderer::new(&config.markdown_styles))
}

/// Sends `messages` and prints the reply as it arrives.
///
/// Ctrl+C abandons the request or the stream; whatever was already written
/// stays on screen and `^C Interrupted.` goes to stderr.
///
/// # Errors
/// Returns an error if the request fails or stdout cannot be written.
pub async fn run_turn(
    client: &ChatCompletionsClient,
    messages: &[ChatMessage],
    config: &Config,
) -> Result<ReplyOutcome> {
    let reply = tokio::select! {
        biased;
        () = interrupt::wait_for_interrupt() => {
            report_interrupt("");
            return Ok(ReplyOutcome {
                text: String::new(),
                interrupted: true,
            });
        }
        reply = client.send(messages) => reply?,
    };

    let outcome = print_reply(reply, config).await?;
    if outcome.interrupted {
        report_interrupt(&outcome.text);
    }
    Ok(outcome)
}

/// Writes a reply to stdout, rendered when rendering is on.
///
/// # Errors
/// Returns an error if the stream fails or stdout cannot be written.
pub async fn print_reply(reply: ChatReply, config: &Config) -> Result<ReplyOutcome> {
    let mut stream = match reply {
        ChatReply::Complete(text) => {
            let output = match renderer_for(config) {
                Some(mut renderer) => renderer.render_text(&text),
                None => text.clone(),
            };
            let mut out = io::stdout().lock();
            out.write_all(output.as_bytes())
                .and_then(|()| out.flush())
                .context("write output")?;
            return Ok(ReplyOutcome {
                text,
                interrupted: false,
            });
        }
        ChatReply::Stream(stream) => stream,
    };

    let mut reassembler = StreamReassembler::new(io::stdout(), renderer_for(config));
    let interrupted = loop {
        tokio::select! {
            biased;
            () = interrupt::wait_for_interrupt() => break true,
            next = stream.next() => match next {
                Some(Ok(delta)) => reassembler.push_str(&delta)?,
                Some(Err(err)) => {
                    let partial = reassembler.finish()?;
                    if !partial.is_empty() && !partial.ends_with('\n') {
                        println!();
                    }
                    return Err(err.into());
                }
                None => break false,
            },
        }
    };

    let text = reassembler.finish()?;
    debug!(chars = text.len(), interrupted, "reply finished");
    Ok(ReplyOutcome { text, interrupted })
}

/// Ends the reply: closes the last line, prints the raw text when
/// `debug_render` is on, then a blank line.
///
/// # Errors
/// Returns an error if stdout cannot be written.
pub fn finish_reply(raw: &str, config: &Config) -> Result<()> {
    let mut out = io::stdout().lock();
    let mut tail = String::new();
    if !raw.ends_with('\n') {
        tail.push('\n');
    }
    if config.debug_render {
        tail.push_str("\n--- RAW ---\n");
        tail.push_str(raw);
        if !raw.ends_with('\n') {
            tail.push('\n');
        }
    }
    tail.push('\n');
    out.write_all(tail.as_bytes())
        .and_then(|()| out.flush())
        .context("write output")
}

fn report_interrupt(partial: &str) {
    if !partial.is_empty() && !partial.ends_with('\n') {
        println!();
    }
    eprintln!("^C Interrupted.");
}
