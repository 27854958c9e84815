//! Style tokens and ANSI escape resolution.
//!
//! A style is an ordered list of tokens. Each token contributes its own
//! escape sequence; the styled span is closed with a single reset.

use std::fmt::Write as _;

const ESC_RESET: &str = "\x1b[0m";

/// 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parses `rrggbb` or `rgb` (no leading `#`). Short form doubles each digit.
    fn from_hex_digits(digits: &str) -> Option<Self> {
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

/// The 16 standard terminal colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl AnsiColor {
    /// Matches a lowercased, underscore-free color name. `gray` and `grey`
    /// are bright black.
    fn from_name(name: &str) -> Option<Self> {
        let (bright, base) = match name.strip_prefix("bright") {
            Some(base) => (true, base),
            None => (false, name),
        };
        let color = match (bright, base) {
            (false, "gray" | "grey") => Self::BrightBlack,
            (_, "black") => Self::pick(bright, Self::Black, Self::BrightBlack),
            (_, "red") => Self::pick(bright, Self::Red, Self::BrightRed),
            (_, "green") => Self::pick(bright, Self::Green, Self::BrightGreen),
            (_, "yellow") => Self::pick(bright, Self::Yellow, Self::BrightYellow),
            (_, "blue") => Self::pick(bright, Self::Blue, Self::BrightBlue),
            (_, "magenta") => Self::pick(bright, Self::Magenta, Self::BrightMagenta),
            (_, "cyan") => Self::pick(bright, Self::Cyan, Self::BrightCyan),
            (_, "white") => Self::pick(bright, Self::White, Self::BrightWhite),
            _ => return None,
        };
        Some(color)
    }

    fn pick(bright: bool, normal: Self, bright_variant: Self) -> Self {
        if bright { bright_variant } else { normal }
    }

    /// SGR foreground code: 30-37, bright 90-97. Backgrounds add 10.
    fn fg_code(self) -> u8 {
        let index = self as u8;
        if index < 8 { 30 + index } else { 90 + index - 8 }
    }
}

/// One atomic styling instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleToken {
    Bold,
    Dim,
    Italic,
    Underline,
    Inverse,
    Strikethrough,
    Color(AnsiColor),
    BgColor(AnsiColor),
    /// Reset foreground to the terminal default (SGR 39).
    DefaultFg,
    /// Reset background to the terminal default (SGR 49).
    DefaultBg,
    Fg(Rgb),
    Bg(Rgb),
}

impl StyleToken {
    /// Resolves a raw token string.
    ///
    /// Order: named attribute/color, default-fg marker, default-bg marker,
    /// `#hex` foreground, `bg#hex` / `bg:#hex` background. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(named) = Self::named(raw) {
            return Some(named);
        }
        match raw {
            "default" | "fg:default" | "fg-default" => return Some(Self::DefaultFg),
            "bg:default" | "bg-default" => return Some(Self::DefaultBg),
            _ => {}
        }
        if let Some(digits) = raw.strip_prefix('#') {
            return Rgb::from_hex_digits(digits).map(Self::Fg);
        }
        let digits = raw
            .strip_prefix("bg:#")
            .or_else(|| raw.strip_prefix("bg#"))?;
        Rgb::from_hex_digits(digits).map(Self::Bg)
    }

    /// Named tokens in camelCase (`brightRed`, `bgBlue`) or snake_case
    /// (`bright_red`, `bg_blue`).
    fn named(raw: &str) -> Option<Self> {
        if !raw.bytes().all(|b| b.is_ascii_alphabetic() || b == b'_') {
            return None;
        }
        let name = raw.replace('_', "").to_ascii_lowercase();
        let token = match name.as_str() {
            "bold" => Self::Bold,
            "dim" => Self::Dim,
            "italic" => Self::Italic,
            "underline" => Self::Underline,
            "inverse" => Self::Inverse,
            "strike" | "strikethrough" => Self::Strikethrough,
            _ => {
                return match name.strip_prefix("bg") {
                    Some(color) => AnsiColor::from_name(color).map(Self::BgColor),
                    None => AnsiColor::from_name(&name).map(Self::Color),
                };
            }
        };
        Some(token)
    }

    fn write_escape(self, out: &mut String) {
        let _ = match self {
            Self::Bold => out.write_str("\x1b[1m"),
            Self::Dim => out.write_str("\x1b[2m"),
            Self::Italic => out.write_str("\x1b[3m"),
            Self::Underline => out.write_str("\x1b[4m"),
            Self::Inverse => out.write_str("\x1b[7m"),
            Self::Strikethrough => out.write_str("\x1b[9m"),
            Self::Color(color) => write!(out, "\x1b[{}m", color.fg_code()),
            Self::BgColor(color) => write!(out, "\x1b[{}m", color.fg_code() + 10),
            Self::DefaultFg => out.write_str("\x1b[39m"),
            Self::DefaultBg => out.write_str("\x1b[49m"),
            Self::Fg(Rgb { r, g, b }) => write!(out, "\x1b[38;2;{r};{g};{b}m"),
            Self::Bg(Rgb { r, g, b }) => write!(out, "\x1b[48;2;{r};{g};{b}m"),
        };
    }
}

/// Ordered list of resolved style tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    tokens: Vec<StyleToken>,
}

impl Style {
    /// Builds a style from raw token strings, dropping the ones that don't resolve.
    pub fn from_tokens<S: AsRef<str>>(raw: &[S]) -> Self {
        Self {
            tokens: raw
                .iter()
                .filter_map(|t| StyleToken::parse(t.as_ref()))
                .collect(),
        }
    }

    pub fn tokens(&self) -> &[StyleToken] {
        &self.tokens
    }

    /// Concatenates two styles, `self` first.
    #[must_use]
    pub fn then(&self, other: &Style) -> Style {
        let mut tokens = self.tokens.clone();
        tokens.extend_from_slice(&other.tokens);
        Style { tokens }
    }

    /// Wraps `text` in this style's escapes plus a trailing reset.
    ///
    /// A style that emits nothing returns `text` untouched (no reset).
    pub fn paint(&self, text: &str) -> String {
        if self.tokens.is_empty() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len() + 16);
        for token in &self.tokens {
            token.write_escape(&mut out);
        }
        out.push_str(text);
        out.push_str(ESC_RESET);
        out
    }
}

/// Applies raw style tokens to `text` in one step.
pub fn apply_style<S: AsRef<str>>(tokens: &[S], text: &str) -> String {
    Style::from_tokens(tokens).paint(text)
}
