//! Chunk-to-line reassembly in front of the renderer.

use std::io::Write;

use anyhow::{Context, Result};

use super::render::MarkdownRenderer;

/// Feeds arbitrarily split chunks to a [`MarkdownRenderer`] one complete
/// line at a time and writes the rendered output to `sink`.
///
/// Without a renderer, text is written through as it arrives.
pub struct StreamReassembler<W: Write> {
    sink: W,
    renderer: Option<MarkdownRenderer>,
    /// Bytes of an incomplete UTF-8 sequence held for the next chunk.
    undecoded: Vec<u8>,
    pending: String,
    raw: String,
}

impl<W: Write> StreamReassembler<W> {
    pub fn new(sink: W, renderer: Option<MarkdownRenderer>) -> Self {
        Self {
            sink,
            renderer,
            undecoded: Vec::new(),
            pending: String::new(),
            raw: String::new(),
        }
    }

    /// Everything received so far, undecorated.
    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    /// Decodes and consumes a byte chunk.
    ///
    /// # Errors
    /// Returns an error if writing to the sink fails.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.undecoded.extend_from_slice(bytes);
        let text = drain_utf8(&mut self.undecoded);
        if text.is_empty() {
            return Ok(());
        }
        self.push_str(&text)
    }

    /// Consumes a decoded text chunk.
    ///
    /// # Errors
    /// Returns an error if writing to the sink fails.
    pub fn push_str(&mut self, text: &str) -> Result<()> {
        self.raw.push_str(text);

        let Some(renderer) = self.renderer.as_mut() else {
            self.sink
                .write_all(text.as_bytes())
                .context("write output")?;
            return self.sink.flush().context("flush output");
        };

        self.pending.push_str(text);
        let Some(last_newline) = self.pending.rfind('\n') else {
            return Ok(());
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        for line in complete[..last_newline].split('\n') {
            let rendered = renderer.render_line(line);
            self.sink
                .write_all(rendered.as_bytes())
                .and_then(|()| self.sink.write_all(b"\n"))
                .context("write output")?;
        }
        self.sink.flush().context("flush output")
    }

    /// Renders whatever is still buffered and returns the full raw text.
    ///
    /// # Errors
    /// Returns an error if writing to the sink fails.
    pub fn finish(mut self) -> Result<String> {
        if !self.undecoded.is_empty() {
            let tail = String::from_utf8_lossy(&self.undecoded).into_owned();
            self.undecoded.clear();
            self.push_str(&tail)?;
        }

        if let Some(renderer) = self.renderer.as_mut()
            && !self.pending.is_empty()
        {
            let rendered = renderer.render_line(&self.pending);
            self.pending.clear();
            self.sink
                .write_all(rendered.as_bytes())
                .context("write output")?;
        }
        self.sink.flush().context("flush output")?;
        Ok(self.raw)
    }
}

/// Takes the longest decodable prefix out of `buf`.
///
/// Invalid sequences become U+FFFD; an incomplete sequence at the very end
/// stays in `buf`.
fn drain_utf8(buf: &mut Vec<u8>) -> String {
    let mut out = String::new();
    let mut start = 0;
    loop {
        match std::str::from_utf8(&buf[start..]) {
            Ok(valid) => {
                out.push_str(valid);
                start = buf.len();
                break;
            }
            Err(err) => {
                let valid_end = start + err.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&buf[start..valid_end]));
                match err.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        start = valid_end + len;
                    }
                    None => {
                        start = valid_end;
                        break;
                    }
                }
            }
        }
    }
    buf.drain(..start);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::Width;

    fn reassembler() -> StreamReassembler<Vec<u8>> {
        let renderer = MarkdownRenderer::default().with_width(Width::Fixed(20));
        StreamReassembler::new(Vec::new(), Some(renderer))
    }

    fn output(r: &StreamReassembler<Vec<u8>>) -> String {
        String::from_utf8(r.sink.clone()).unwrap()
    }

    #[test]
    fn test_code_fence_split_across_chunks() {
        let mut r = reassembler();
        r.push_str("```py\nprint(").unwrap();
        r.push_str("1)\n```\n").unwrap();

        let top = format!("\x1b[2m┌{}┐\x1b[0m", "─".repeat(18));
        let code = "\x1b[2m│ \x1b[0m\x1b[40m\x1b[36mprint(1)\x1b[0m";
        let bottom = format!("\x1b[2m└{}┘\x1b[0m", "─".repeat(18));
        assert_eq!(output(&r), format!("{top}\n{code}\n{bottom}\n"));
        assert_eq!(r.finish().unwrap(), "```py\nprint(1)\n```\n");
    }

    #[test]
    fn test_lines_are_written_as_soon_as_complete() {
        let mut r = reassembler();
        r.push_str("first li").unwrap();
        assert_eq!(output(&r), "");
        r.push_str("ne\nsecond").unwrap();
        assert_eq!(output(&r), "first line\n");
    }

    #[test]
    fn test_finish_renders_trailing_fragment_without_newline() {
        let mut r = reassembler();
        r.push_str("done\n**tail**").unwrap();
        let sink_before = output(&r);
        assert_eq!(sink_before, "done\n");

        let mut sink = Vec::new();
        let mut r2 = StreamReassembler::new(
            &mut sink,
            Some(MarkdownRenderer::default().with_width(Width::Fixed(20))),
        );
        r2.push_str("done\n**tail**").unwrap();
        let raw = r2.finish().unwrap();
        assert_eq!(raw, "done\n**tail**");
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "done\n\x1b[1mtail\x1b[0m"
        );
    }

    #[test]
    fn test_raw_text_is_independent_of_split_points() {
        let text = "# Zürich ☕\n\n    code\n```md\n_x_ 日本\n```\nend";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut r = reassembler();
            r.push_bytes(&bytes[..split]).unwrap();
            r.push_bytes(&bytes[split..]).unwrap();
            assert_eq!(r.finish().unwrap(), text, "split at byte {split}");
        }
    }

    #[test]
    fn test_rendered_output_is_independent_of_split_points() {
        let text = "intro\n## Häder\n```\nλ\n```\n";
        let mut whole = reassembler();
        whole.push_str(text).unwrap();
        let expected = output(&whole);

        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut r = reassembler();
            r.push_bytes(&bytes[..split]).unwrap();
            r.push_bytes(&bytes[split..]).unwrap();
            assert_eq!(output(&r), expected, "split at byte {split}");
        }
    }

    #[test]
    fn test_multibyte_char_fed_one_byte_at_a_time() {
        let mut r = reassembler();
        for byte in "é\n".as_bytes() {
            r.push_bytes(std::slice::from_ref(byte)).unwrap();
        }
        assert_eq!(output(&r), "é\n");
        assert_eq!(r.raw_text(), "é\n");
    }

    #[test]
    fn test_invalid_bytes_become_replacement_chars() {
        let mut r = reassembler();
        r.push_bytes(b"a\xffb\n").unwrap();
        assert_eq!(output(&r), "a\u{fffd}b\n");
    }

    #[test]
    fn test_truncated_sequence_at_end_is_decoded_lossily() {
        let mut r = reassembler();
        r.push_bytes(b"ok\xe2\x82").unwrap();
        assert_eq!(r.raw_text(), "ok");
        assert_eq!(r.finish().unwrap(), "ok\u{fffd}");
    }

    #[test]
    fn test_pass_through_without_renderer() {
        let mut sink = Vec::new();
        let mut r = StreamReassembler::new(&mut sink, None);
        r.push_str("# not ").unwrap();
        r.push_str("styled").unwrap();
        assert_eq!(r.finish().unwrap(), "# not styled");
        assert_eq!(String::from_utf8(sink).unwrap(), "# not styled");
    }
}
