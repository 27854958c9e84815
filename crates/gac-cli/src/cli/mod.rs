//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use gac_core::config::Config;
use gac_core::core::{interrupt, logging};
use gac_core::prompts::PromptMode;

mod commands;

#[derive(Parser)]
#[command(name = "gac")]
#[command(version)]
#[command(about = "GPT4All CLI: ask, suggest, explain and chat with rendered markdown replies")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Single prompt mode (alias for `ask`)
    #[arg(short = 'a', value_name = "PROMPT", num_args = 1.., allow_hyphen_values = true)]
    ask: Option<Vec<String>>,

    /// Disable markdown rendering
    #[arg(long, global = true)]
    no_render: bool,

    /// Show both rendered and raw output
    #[arg(long, global = true)]
    debug_render: bool,

    /// Provide more detailed suggestions (suggest mode)
    #[arg(short = 'd', long, global = true)]
    detailed_suggest: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Ask a question
    Ask(PromptArgs),
    /// Get a command or snippet for a task on this system
    Suggest(PromptArgs),
    /// Get a step-by-step explanation
    Explain(PromptArgs),
    /// Interactive chat
    Chat,
    /// List server models and set the default
    Models {
        #[command(subcommand)]
        command: Option<ModelsCommands>,
    },
    /// View or edit configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Render a markdown file (or stdin) to the terminal
    Render {
        /// File to render; reads stdin when omitted
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct PromptArgs {
    /// The prompt to send
    #[arg(value_name = "PROMPT", required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    prompt: Vec<String>,
}

#[derive(clap::Subcommand)]
enum ModelsCommands {
    /// List the models the server offers
    List,
    /// Set the default model
    Use {
        /// Model id (use `gpt4all` for the server's default)
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the config file path and effective settings
    Show,
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print a setting (dotted keys address nested tables)
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Change a setting in the config file
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        /// JSON object/array, true/false, null (removes the key), a number, or text
        #[arg(value_name = "VALUE", required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.command.is_none() && cli.ask.is_none() {
        Cli::command().print_help().context("print help")?;
        return Ok(());
    }

    let _log_guard = logging::init()?;
    interrupt::init()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(dispatch(cli))
}

/// Loads the config file and applies command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("load config")?;
    if cli.no_render {
        config.render_markdown = false;
    }
    if cli.debug_render {
        config.debug_render = true;
    }
    if cli.detailed_suggest {
        config.detailed_suggest = true;
    }
    Ok(config)
}

async fn dispatch(cli: Cli) -> Result<()> {
    if let Some(words) = &cli.ask {
        if cli.command.is_some() {
            bail!("-a cannot be combined with a command");
        }
        let config = load_config(&cli)?;
        return commands::ask::run(PromptMode::Ask, words, &config).await;
    }

    let Some(command) = &cli.command else {
        return Ok(());
    };

    match command {
        Commands::Ask(args) => {
            commands::ask::run(PromptMode::Ask, &args.prompt, &load_config(&cli)?).await
        }
        Commands::Suggest(args) => {
            commands::ask::run(PromptMode::Suggest, &args.prompt, &load_config(&cli)?).await
        }
        Commands::Explain(args) => {
            commands::ask::run(PromptMode::Explain, &args.prompt, &load_config(&cli)?).await
        }
        Commands::Chat => commands::chat::run(&load_config(&cli)?).await,

        Commands::Models { command } => match command {
            None | Some(ModelsCommands::List) => commands::models::list(&load_config(&cli)?).await,
            Some(ModelsCommands::Use { id }) => commands::models::set_default(id),
        },

        Commands::Config { command } => match command {
            None | Some(ConfigCommands::Show) => commands::config::show(&load_config(&cli)?),
            Some(ConfigCommands::Path) => {
                commands::config::path();
                Ok(())
            }
            Some(ConfigCommands::Init) => commands::config::init(),
            Some(ConfigCommands::Get { key }) => commands::config::get(&load_config(&cli)?, key),
            Some(ConfigCommands::Set { key, value }) => commands::config::set(key, &value.join(" ")),
        },

        Commands::Render { file } => commands::render::run(file.as_deref(), &load_config(&cli)?),
    }
}
