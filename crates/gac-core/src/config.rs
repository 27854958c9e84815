//! Configuration management for gac.
//!
//! Loads configuration from ${GAC_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item, TableLike};
use tracing::debug;

use crate::markdown::StyleOverrides;

/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments and sections from the template are always present, while the
/// user's values win.
fn merge_with_template(user_config: &str) -> Result<String> {
    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for gac configuration and log files.
    //!
    //! `GAC_HOME` resolution order:
    //! 1. `GAC_HOME` environment variable (if set)
    //! 2. ~/.gac (default)
    //! 3. ./.gac when no home directory is known

    use std::path::PathBuf;

    /// Returns the gac home directory.
    pub fn gac_home() -> PathBuf {
        if let Ok(home) = std::env::var("GAC_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(|| PathBuf::from(".gac"), |h| h.join(".gac"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        gac_home().join("config.toml")
    }

    /// Returns the path to the log file written when `GAC_LOG` is set.
    pub fn log_path() -> PathBuf {
        gac_home().join("gac.log")
    }
}

fn default_model() -> String {
    Config::DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server root; resolved against `GAC_BASE_URL` and the built-in default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stream: bool,
    pub render_markdown: bool,
    pub debug_render: bool,
    pub detailed_suggest: bool,
    pub markdown_styles: StyleOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            model: Self::DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            stream: true,
            render_markdown: true,
            debug_render: false,
            detailed_suggest: false,
            markdown_styles: StyleOverrides::default(),
        }
    }
}

impl Config {
    pub const DEFAULT_MODEL: &str = "gpt4all";
    const DEFAULT_TEMPERATURE: f64 = 0.7;
    const DEFAULT_MAX_TOKENS: u32 = 512;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves only the model field to the config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn save_model(model: &str) -> Result<()> {
        Self::save_model_to(&paths::config_path(), model)
    }

    /// Saves only the model field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn save_model_to(path: &Path, model: &str) -> Result<()> {
        let mut doc = Self::editable_document(path)?;
        doc["model"] = toml_edit::value(model);
        Self::write_config(path, &doc.to_string())
    }

    /// Sets a dotted key to a coerced value in the config file.
    ///
    /// # Errors
    /// Returns an error if the key is empty, the result is not a valid
    /// config, or the file cannot be read or written.
    pub fn set_value(key: &str, raw: &str) -> Result<Config> {
        Self::set_value_to(&paths::config_path(), key, raw)
    }

    /// Sets a dotted key in a specific config file and returns the new config.
    ///
    /// `null` removes the key. Nothing is written unless the edited file
    /// still parses as a `Config`.
    ///
    /// # Errors
    /// Returns an error if the key is empty, the result is not a valid
    /// config, or the file cannot be read or written.
    pub fn set_value_to(path: &Path, key: &str, raw: &str) -> Result<Config> {
        let parts: Vec<&str> = key.split('.').map(str::trim).collect();
        let Some((last, parents)) = parts.split_last() else {
            bail!("Config key must not be empty");
        };
        if parts.iter().any(|p| p.is_empty()) {
            bail!("Invalid config key: {key}");
        }

        let mut doc = Self::editable_document(path)?;
        let table = table_at(doc.as_table_mut(), parents)?;
        match coerce_value(raw) {
            Some(item) => {
                table.insert(last, item);
            }
            None => {
                table.remove(last);
            }
        }

        let contents = doc.to_string();
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid value for {key}: {raw}"))?;
        Self::write_config(path, &contents)?;
        debug!(key, path = %path.display(), "config value updated");
        Ok(config)
    }

    /// Looks up a dotted key in the effective configuration.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized.
    pub fn get(&self, key: &str) -> Result<Option<toml::Value>> {
        let mut cursor = toml::Value::try_from(self).context("Failed to serialize config")?;
        for part in key.split('.') {
            let Some(next) = cursor.get(part.trim()).cloned() else {
                return Ok(None);
            };
            cursor = next;
        }
        Ok(Some(cursor))
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    ///
    /// # Errors
    /// Returns an error if the file exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// The config file merged into the template, or the template alone.
    fn editable_document(path: &Path) -> Result<DocumentMut> {
        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            default_config_template().to_string()
        };

        contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

/// Walks (and creates) the nested tables named by `parts`.
///
/// A non-table value in the way is replaced by a table.
fn table_at<'a>(
    root: &'a mut toml_edit::Table,
    parts: &[&str],
) -> Result<&'a mut dyn TableLike> {
    let mut cursor: &mut dyn TableLike = root;
    for part in parts {
        let entry = cursor.entry(part).or_insert_with(toml_edit::table);
        if entry.as_table_like().is_none() {
            *entry = toml_edit::table();
        }
        let Some(next) = entry.as_table_like_mut() else {
            bail!("Config key segment {part} is not a table");
        };
        cursor = next;
    }
    Ok(cursor)
}

/// Coerces a command-line value into a TOML item; `None` means "remove".
///
/// JSON object/array literals, `true`/`false`, `null` and numbers are
/// recognised; anything else is a string.
fn coerce_value(raw: &str) -> Option<Item> {
    let trimmed = raw.trim();
    if ((trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']')))
        && let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed)
        && let Some(value) = json_to_toml(&json)
    {
        return Some(Item::Value(value));
    }

    match trimmed {
        "true" => return Some(toml_edit::value(true)),
        "false" => return Some(toml_edit::value(false)),
        "null" => return None,
        _ => {}
    }

    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(toml_edit::value(int));
    }
    if let Ok(float) = trimmed.parse::<f64>()
        && float.is_finite()
    {
        return Some(toml_edit::value(float));
    }

    Some(toml_edit::value(raw))
}

/// Converts JSON into an inline TOML value. JSON `null` has no TOML form:
/// object members holding it are dropped and arrays containing it fail.
fn json_to_toml(json: &serde_json::Value) -> Option<toml_edit::Value> {
    use serde_json::Value as Json;

    match json {
        Json::Null => None,
        Json::Bool(b) => Some((*b).into()),
        Json::Number(n) => n
            .as_i64()
            .map(toml_edit::Value::from)
            .or_else(|| n.as_f64().map(toml_edit::Value::from)),
        Json::String(s) => Some(s.as_str().into()),
        Json::Array(items) => {
            let mut array = toml_edit::Array::new();
            for item in items {
                array.push(json_to_toml(item)?);
            }
            Some(toml_edit::Value::Array(array))
        }
        Json::Object(members) => {
            let mut table = toml_edit::InlineTable::new();
            for (key, value) in members {
                if let Some(value) = json_to_toml(value) {
                    table.insert(key, value);
                }
            }
            Some(toml_edit::Value::InlineTable(table))
        }
    }
}
