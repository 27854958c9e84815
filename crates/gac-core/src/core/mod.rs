//! Core module: process-wide runtime concerns.
//!
//! This module contains:
//! - `interrupt`: Ctrl+C handling for abandoning a running reply
//! - `logging`: opt-in file logging

pub mod interrupt;
pub mod logging;
