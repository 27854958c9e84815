//! Render command handler: markdown from a file or stdin, no server needed.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use gac_core::config::Config;
use gac_core::markdown::StreamReassembler;

use crate::modes::exec::renderer_for;

const CHUNK_SIZE: usize = 4096;

pub fn run(file: Option<&Path>, config: &Config) -> Result<()> {
    let mut input: Box<dyn Read> = match file {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("open {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let stdout = io::stdout();
    let mut reassembler = StreamReassembler::new(stdout.lock(), renderer_for(config));
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = input.read(&mut buf).context("read input")?;
        if read == 0 {
            break;
        }
        reassembler.push_bytes(&buf[..read])?;
    }

    let raw = reassembler.finish()?;
    if !raw.is_empty() && !raw.ends_with('\n') {
        let mut out = stdout.lock();
        out.write_all(b"\n")
            .and_then(|()| out.flush())
            .context("write output")?;
    }
    Ok(())
}
