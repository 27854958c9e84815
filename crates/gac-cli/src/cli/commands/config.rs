//! Config command handlers.

use anyhow::{Context, Result, bail};
use gac_core::config;

const MASKED_KEY: &str = "********";

pub fn show(config: &config::Config) -> Result<()> {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some(MASKED_KEY.to_string());
    }
    let body = toml::to_string_pretty(&shown).context("serialize config")?;
    println!("Config file: {}", config::paths::config_path().display());
    println!();
    print!("{body}");
    Ok(())
}

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn get(config: &config::Config, key: &str) -> Result<()> {
    match config.get(key)? {
        Some(toml::Value::String(text)) => println!("{text}"),
        Some(value) => println!("{}", format_value(key, &value)?),
        None => bail!("Unknown config key: {key}"),
    }
    Ok(())
}

pub fn set(key: &str, raw: &str) -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::set_value_to(&config_path, key, raw)
        .with_context(|| format!("update config at {}", config_path.display()))?;
    println!("Updated {key} in {}", config_path.display());
    Ok(())
}

/// Tables print as a TOML document, everything else as an inline value.
fn format_value(key: &str, value: &toml::Value) -> Result<String> {
    if value.is_table() {
        let body = toml::to_string_pretty(value).with_context(|| format!("serialize {key}"))?;
        Ok(body.trim_end().to_string())
    } else {
        Ok(value.to_string())
    }
}
