//! Models command handlers.

use anyhow::{Context, Result, bail};
use gac_core::config::Config;
use gac_core::providers::{ChatCompletionsClient, ChatCompletionsConfig};

pub async fn list(config: &Config) -> Result<()> {
    let client = ChatCompletionsClient::new(ChatCompletionsConfig::from_config(config)?);
    let models = client.list_models().await.context("list models")?;

    if models.is_empty() {
        println!("No models found from the server.");
        return Ok(());
    }

    println!("Available models:");
    for id in &models {
        let marker = if *id == config.model { " (default)" } else { "" };
        println!("- {id}{marker}");
    }
    Ok(())
}

pub fn set_default(id: &str) -> Result<()> {
    let id = id.trim();
    if id.is_empty() {
        bail!("Model id must not be empty");
    }
    Config::save_model(id).context("save default model")?;
    println!("Default model set to \"{id}\".");
    Ok(())
}
