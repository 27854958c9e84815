//! Line-at-a-time markdown renderer.
//!
//! The renderer keeps just enough state between calls to know whether it is
//! inside a code block or a `markdown` wrapper fence, so it can be fed one
//! line at a time as a reply streams in.

use std::sync::LazyLock;

use regex::Regex;
use unicode_width::UnicodeWidthStr;

use super::inline::render_inline;
use super::spec::{StyleOverrides, StyleSpec};
use super::style::Style;

const MIN_RULE_WIDTH: u16 = 20;
const MAX_RULE_WIDTH: u16 = 100;
const FALLBACK_TERMINAL_WIDTH: u16 = 80;
const MIN_UNDERLINE_WIDTH: usize = 4;
const THEMATIC_BREAK_WIDTH: usize = 24;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+|\d+\.\s+)?(```|~~~)\s*([A-Za-z0-9_-]+)?\s*$")
        .expect("fence pattern")
});
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6})\s+(.+?)(?:\s+#+)?\s*$").expect("header pattern")
});
static LIST_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*[-*+]+\s+|\s*\d+[.)]\s+)(#{1,6})\s+(.+?)(?:\s+#+)?\s*$")
        .expect("list header pattern")
});
static THEMATIC_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-{3,}|_{3,}|\*{3,})\s*$").expect("thematic break pattern"));

/// Fence character family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fence {
    Backtick,
    Tilde,
}

impl Fence {
    fn from_marker(marker: &str) -> Self {
        if marker.starts_with('~') {
            Fence::Tilde
        } else {
            Fence::Backtick
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Fence::Backtick => "```",
            Fence::Tilde => "~~~",
        }
    }
}

/// Block context of the renderer.
///
/// `within` remembers an enclosing `markdown` wrapper fence, so a code block
/// opened inside a wrapper hands control back to the wrapper when it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockState {
    #[default]
    Normal,
    FencedCode {
        fence: Fence,
        within: Option<Fence>,
    },
    IndentedCode {
        within: Option<Fence>,
    },
    MarkdownWrapper {
        fence: Fence,
    },
}

impl BlockState {
    /// The markdown wrapper fence currently open, if any.
    pub fn wrapper(self) -> Option<Fence> {
        match self {
            BlockState::Normal => None,
            BlockState::FencedCode { within, .. } | BlockState::IndentedCode { within } => within,
            BlockState::MarkdownWrapper { fence } => Some(fence),
        }
    }

    fn after_block(within: Option<Fence>) -> Self {
        within.map_or(BlockState::Normal, |fence| BlockState::MarkdownWrapper { fence })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererState {
    pub block: BlockState,
    /// Whether the previous source line was blank.
    pub prev_line_blank: bool,
}

impl Default for RendererState {
    fn default() -> Self {
        Self {
            block: BlockState::Normal,
            prev_line_blank: true,
        }
    }
}

/// Where the code-border rule width comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Width {
    /// Current terminal width, read at render time.
    #[default]
    Terminal,
    Fixed(u16),
}

impl Width {
    fn columns(self) -> u16 {
        match self {
            Width::Terminal => crossterm::terminal::size()
                .map(|(w, _)| w)
                .unwrap_or(FALLBACK_TERMINAL_WIDTH),
            Width::Fixed(w) => w,
        }
    }
}

struct FenceLine {
    fence: Fence,
    /// Lowercased language tag; `None` when the fence is bare.
    lang: Option<String>,
}

impl FenceLine {
    fn parse(line: &str) -> Option<Self> {
        let caps = FENCE.captures(line)?;
        Some(Self {
            fence: Fence::from_marker(&caps[1]),
            lang: caps.get(2).map(|m| m.as_str().to_lowercase()),
        })
    }

    fn is_markdown(&self) -> bool {
        matches!(self.lang.as_deref(), Some("markdown" | "md"))
    }
}

/// Strips one indent level (a tab or four spaces).
fn strip_indent(line: &str) -> Option<&str> {
    line.strip_prefix('\t')
        .or_else(|| line.strip_prefix("    "))
}

/// Stateful markdown-to-ANSI line renderer.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    spec: StyleSpec,
    code_style: Style,
    state: RendererState,
    width: Width,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::with_spec(StyleSpec::default())
    }
}

impl MarkdownRenderer {
    pub fn new(overrides: &StyleOverrides) -> Self {
        Self::with_spec(StyleSpec::from_overrides(overrides))
    }

    pub fn with_spec(spec: StyleSpec) -> Self {
        let code_style = spec.code_background.then(&spec.code_styles);
        Self {
            spec,
            code_style,
            state: RendererState::default(),
            width: Width::Terminal,
        }
    }

    #[must_use]
    pub fn with_width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    pub fn state(&self) -> &RendererState {
        &self.state
    }

    pub fn spec(&self) -> &StyleSpec {
        &self.spec
    }

    /// Renders a whole document: split on `\n`, render each line, rejoin.
    pub fn render_text(&mut self, text: &str) -> String {
        text.split('\n')
            .map(|line| self.render_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders one source line. The result may span several output lines
    /// (border rules, header underlines) or be empty (wrapper fences).
    pub fn render_line(&mut self, line: &str) -> String {
        let line = line.replace('\r', "");
        let is_blank = line.trim().is_empty();

        if let Some(fence_line) = FenceLine::parse(&line) {
            return self.render_fence(&line, &fence_line);
        }

        match self.state.block {
            BlockState::FencedCode { .. } => {
                self.state.prev_line_blank = false;
                self.code_line(&line)
            }
            BlockState::IndentedCode { within } => {
                if let Some(code) = strip_indent(&line) {
                    self.state.prev_line_blank = false;
                    return self.code_line(code);
                }
                self.state.block = BlockState::after_block(within);
                let body = self.render_markdown(&line, is_blank);
                match self.closing_rule() {
                    Some(rule) => format!("{rule}\n{body}"),
                    None => body,
                }
            }
            BlockState::Normal | BlockState::MarkdownWrapper { .. } => {
                if self.state.prev_line_blank
                    && let Some(code) = strip_indent(&line)
                {
                    self.state.block = BlockState::IndentedCode {
                        within: self.state.block.wrapper(),
                    };
                    self.state.prev_line_blank = false;
                    let code = self.code_line(code);
                    return match self.opening_rule() {
                        Some(rule) => format!("{rule}\n{code}"),
                        None => code,
                    };
                }
                self.render_markdown(&line, is_blank)
            }
        }
    }

    fn render_fence(&mut self, line: &str, fence_line: &FenceLine) -> String {
        let bare = fence_line.lang.is_none();
        self.state.prev_line_blank = false;

        match self.state.block {
            BlockState::FencedCode { fence, within } if fence == fence_line.fence && bare => {
                self.state.block = BlockState::after_block(within);
                return self.closing_rule().unwrap_or_default();
            }
            // Other fence family, or a tagged fence: literal code.
            BlockState::FencedCode { .. } => return self.code_line(line),
            _ => {}
        }

        // A fence ends an indented block before doing anything else.
        let mut out = String::new();
        if let BlockState::IndentedCode { within } = self.state.block {
            self.state.block = BlockState::after_block(within);
            if let Some(rule) = self.closing_rule() {
                out.push_str(&rule);
            }
        }

        match self.state.block.wrapper() {
            Some(fence) if fence == fence_line.fence && bare => {
                self.state.block = BlockState::Normal;
                return out;
            }
            None if fence_line.is_markdown() => {
                self.state.block = BlockState::MarkdownWrapper {
                    fence: fence_line.fence,
                };
                return out;
            }
            wrapper => {
                self.state.block = BlockState::FencedCode {
                    fence: fence_line.fence,
                    within: wrapper,
                };
            }
        }

        if let Some(rule) = self.opening_rule() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&rule);
        }
        out
    }

    /// Renders a line outside any code block and records its blank status.
    fn render_markdown(&mut self, line: &str, is_blank: bool) -> String {
        let prev_blank = self.state.prev_line_blank;
        self.state.prev_line_blank = is_blank;
        let trimmed = line.trim();

        if let Some(caps) = HEADER.captures(trimmed) {
            return self.header(caps[1].len() as u8, &caps[2], "", prev_blank);
        }

        if let Some(caps) = LIST_HEADER.captures(line) {
            return self.header(caps[2].len() as u8, &caps[3], &caps[1], prev_blank);
        }

        if THEMATIC_BREAK.is_match(trimmed) {
            let rule = self.spec.header_underline_char.repeat(THEMATIC_BREAK_WIDTH);
            return self.spec.header_underline_style.paint(&rule);
        }

        if trimmed.starts_with('>') {
            return self.spec.quote_style.paint(&render_inline(line, &self.spec));
        }

        render_inline(line, &self.spec)
    }

    fn header(&self, level: u8, text: &str, prefix: &str, prev_blank: bool) -> String {
        let styled = self.spec.header_style(level).paint(text);
        let separator = if prev_blank { "" } else { "\n" };
        if !self.spec.underlines_level(level) {
            return format!("{separator}{prefix}{styled}");
        }

        let underline = self
            .spec
            .header_underline_char
            .repeat(text.width().max(MIN_UNDERLINE_WIDTH));
        let pad = " ".repeat(prefix.replace('\t', "    ").chars().count());
        format!(
            "{separator}{prefix}{styled}\n{pad}{}",
            self.spec.header_underline_style.paint(&underline)
        )
    }

    fn code_line(&self, code: &str) -> String {
        format!(
            "{}{}",
            self.spec.code_border_style.paint(&self.spec.code_gutter),
            self.code_style.paint(code)
        )
    }

    fn opening_rule(&self) -> Option<String> {
        let chars = &self.spec.code_border_chars;
        self.rule(&chars.top_left, &chars.top, &chars.top_right)
    }

    fn closing_rule(&self) -> Option<String> {
        let chars = &self.spec.code_border_chars;
        self.rule(&chars.bottom_left, &chars.bottom, &chars.bottom_right)
    }

    fn rule(&self, left: &str, fill: &str, right: &str) -> Option<String> {
        if !self.spec.code_border {
            return None;
        }
        let width = self.width.columns().clamp(MIN_RULE_WIDTH, MAX_RULE_WIDTH);
        let inner = fill.repeat(usize::from(width - 2));
        Some(
            self.spec
                .code_border_style
                .paint(&format!("{left}{inner}{right}")),
        )
    }
}
