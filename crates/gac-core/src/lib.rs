//! Core gac library (markdown rendering, provider, config).

pub mod config;
pub mod core;
pub mod markdown;
pub mod prompts;
pub mod providers;
