//! Runtime execution modes.
//!
//! - `exec`: one request, reply streamed to stdout
//! - `chat`: line-based interactive loop on top of `exec`

pub mod chat;
pub mod exec;
