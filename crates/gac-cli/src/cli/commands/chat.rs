//! Chat command handler.

use anyhow::{Context, Result};
use gac_core::config::Config;

use crate::modes;

pub async fn run(config: &Config) -> Result<()> {
    modes::chat::run_interactive_chat(config)
        .await
        .context("chat")
}
