//! Streaming markdown-to-ANSI rendering for terminal output.

mod inline;
mod render;
mod spec;
mod stream;
mod style;

pub use inline::render_inline;
pub use render::{BlockState, Fence, MarkdownRenderer, RendererState, Width};
pub use spec::{BorderChars, BorderCharsOverrides, HEADER_LEVELS, StyleOverrides, StyleSpec, TokenList};
pub use stream::StreamReassembler;
pub use style::{AnsiColor, Rgb, Style, StyleToken, apply_style};
