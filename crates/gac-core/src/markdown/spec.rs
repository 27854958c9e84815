//! Markdown style specification: defaults, user overrides and their merge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::style::Style;

pub const HEADER_LEVELS: std::ops::RangeInclusive<u8> = 1..=6;

/// A token list as written in config: either `"bold"` or `["bold", "#fff"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenList {
    One(String),
    Many(Vec<String>),
}

impl TokenList {
    pub fn to_style(&self) -> Style {
        match self {
            TokenList::One(token) => Style::from_tokens(std::slice::from_ref(token)),
            TokenList::Many(tokens) => Style::from_tokens(tokens),
        }
    }
}

impl From<&[&str]> for TokenList {
    fn from(tokens: &[&str]) -> Self {
        TokenList::Many(tokens.iter().map(|t| (*t).to_string()).collect())
    }
}

/// Partial code-border glyph set. Missing glyphs keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderCharsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_right: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom_left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom_right: Option<String>,
}

/// User-supplied markdown style overrides (`[markdown_styles]` in config).
///
/// Every field is optional. `header_styles_by_level` and `code_border_chars`
/// merge key-by-key over the defaults; all other fields replace them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_styles: Option<TokenList>,
    /// Keyed by header level, `"1"` through `"6"`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub header_styles_by_level: BTreeMap<String, TokenList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_underline_levels: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_underline_style: Option<TokenList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_underline_char: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_styles: Option<TokenList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_background: Option<TokenList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_border: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_border_style: Option<TokenList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_gutter: Option<String>,
    #[serde(skip_serializing_if = "is_default_border")]
    pub code_border_chars: BorderCharsOverrides,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_code_style: Option<TokenList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_style: Option<TokenList>,
}

fn is_default_border(chars: &BorderCharsOverrides) -> bool {
    *chars == BorderCharsOverrides::default()
}

/// Resolved code-border glyphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderChars {
    pub top_left: String,
    pub top: String,
    pub top_right: String,
    pub bottom_left: String,
    pub bottom: String,
    pub bottom_right: String,
}

impl Default for BorderChars {
    fn default() -> Self {
        Self {
            top_left: "┌".to_string(),
            top: "─".to_string(),
            top_right: "┐".to_string(),
            bottom_left: "└".to_string(),
            bottom: "─".to_string(),
            bottom_right: "┘".to_string(),
        }
    }
}

impl BorderChars {
    fn merged(overrides: &BorderCharsOverrides) -> Self {
        let defaults = Self::default();
        let pick = |o: &Option<String>, d: String| o.clone().unwrap_or(d);
        Self {
            top_left: pick(&overrides.top_left, defaults.top_left),
            top: pick(&overrides.top, defaults.top),
            top_right: pick(&overrides.top_right, defaults.top_right),
            bottom_left: pick(&overrides.bottom_left, defaults.bottom_left),
            bottom: pick(&overrides.bottom, defaults.bottom),
            bottom_right: pick(&overrides.bottom_right, defaults.bottom_right),
        }
    }
}

/// Effective, immutable style specification used by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSpec {
    pub header_styles: Style,
    header_styles_by_level: BTreeMap<u8, Style>,
    pub header_underline: bool,
    /// Levels that get an underline; empty means none.
    pub header_underline_levels: Vec<u8>,
    pub header_underline_style: Style,
    pub header_underline_char: String,
    pub code_styles: Style,
    pub code_background: Style,
    pub code_border: bool,
    pub code_border_style: Style,
    pub code_gutter: String,
    pub code_border_chars: BorderChars,
    pub inline_code_style: Style,
    pub quote_style: Style,
}

impl Default for StyleSpec {
    fn default() -> Self {
        Self::from_overrides(&StyleOverrides::default())
    }
}

fn default_level_tokens(level: u8) -> &'static [&'static str] {
    match level {
        1 => &["bold", "brightWhite"],
        2 | 3 => &["bold"],
        _ => &["dim"],
    }
}

impl StyleSpec {
    /// Merges `overrides` over the built-in defaults.
    pub fn from_overrides(overrides: &StyleOverrides) -> Self {
        let style_or = |o: &Option<TokenList>, default: &[&str]| {
            o.as_ref()
                .map_or_else(|| Style::from_tokens(default), TokenList::to_style)
        };

        let mut header_styles_by_level: BTreeMap<u8, Style> = HEADER_LEVELS
            .map(|level| (level, Style::from_tokens(default_level_tokens(level))))
            .collect();
        for (key, tokens) in &overrides.header_styles_by_level {
            if let Ok(level) = key.trim().parse::<u8>()
                && HEADER_LEVELS.contains(&level)
            {
                header_styles_by_level.insert(level, tokens.to_style());
            }
        }

        Self {
            header_styles: style_or(&overrides.header_styles, &["bold"]),
            header_styles_by_level,
            header_underline: overrides.header_underline.unwrap_or(true),
            header_underline_levels: overrides
                .header_underline_levels
                .clone()
                .unwrap_or_else(|| vec![1]),
            header_underline_style: style_or(&overrides.header_underline_style, &["dim"]),
            header_underline_char: overrides
                .header_underline_char
                .clone()
                .unwrap_or_else(|| "─".to_string()),
            code_styles: style_or(&overrides.code_styles, &["cyan"]),
            code_background: style_or(&overrides.code_background, &["bgBlack"]),
            code_border: overrides.code_border.unwrap_or(true),
            code_border_style: style_or(&overrides.code_border_style, &["dim"]),
            code_gutter: overrides
                .code_gutter
                .clone()
                .unwrap_or_else(|| "│ ".to_string()),
            code_border_chars: BorderChars::merged(&overrides.code_border_chars),
            inline_code_style: style_or(&overrides.inline_code_style, &["dim"]),
            quote_style: style_or(&overrides.quote_style, &["dim"]),
        }
    }

    /// Header style for `level`, falling back to `header_styles`.
    pub fn header_style(&self, level: u8) -> &Style {
        self.header_styles_by_level
            .get(&level)
            .unwrap_or(&self.header_styles)
    }

    pub fn underlines_level(&self, level: u8) -> bool {
        self.header_underline && self.header_underline_levels.contains(&level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_level() {
        let spec = StyleSpec::default();
        assert_eq!(*spec.header_style(1), Style::from_tokens(&["bold", "brightWhite"]));
        assert_eq!(*spec.header_style(3), Style::from_tokens(&["bold"]));
        assert_eq!(*spec.header_style(6), Style::from_tokens(&["dim"]));
        assert!(spec.underlines_level(1));
        assert!(!spec.underlines_level(2));
    }

    #[test]
    fn test_level_override_keeps_other_levels() {
        let mut overrides = StyleOverrides::default();
        overrides
            .header_styles_by_level
            .insert("1".to_string(), TokenList::One("italic".to_string()));

        let spec = StyleSpec::from_overrides(&overrides);
        assert_eq!(*spec.header_style(1), Style::from_tokens(&["italic"]));
        assert_eq!(*spec.header_style(6), Style::from_tokens(&["dim"]));
    }

    #[test]
    fn test_out_of_range_level_keys_are_ignored() {
        let mut overrides = StyleOverrides::default();
        overrides
            .header_styles_by_level
            .insert("9".to_string(), TokenList::One("italic".to_string()));
        overrides
            .header_styles_by_level
            .insert("h1".to_string(), TokenList::One("italic".to_string()));

        assert_eq!(StyleSpec::from_overrides(&overrides), StyleSpec::default());
    }

    #[test]
    fn test_single_border_glyph_override_keeps_the_rest() {
        let overrides = StyleOverrides {
            code_border_chars: BorderCharsOverrides {
                top_left: Some("╭".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let chars = StyleSpec::from_overrides(&overrides).code_border_chars;
        assert_eq!(chars.top_left, "╭");
        assert_eq!(chars.top_right, "┐");
        assert_eq!(chars.bottom_right, "┘");
    }

    #[test]
    fn test_top_level_keys_replace() {
        let overrides = StyleOverrides {
            code_styles: Some(TokenList::from(&["#ff8800"][..])),
            header_underline_levels: Some(vec![1, 2]),
            ..Default::default()
        };

        let spec = StyleSpec::from_overrides(&overrides);
        assert_eq!(spec.code_styles, Style::from_tokens(&["#ff8800"]));
        assert!(spec.underlines_level(2));
        assert!(!spec.underlines_level(3));
    }

    #[test]
    fn test_overrides_deserialize_from_toml() {
        let overrides: StyleOverrides = toml::from_str(
            r##"
header_underline = false
code_styles = "#00ff00"

[header_styles_by_level]
2 = ["italic", "underline"]

[code_border_chars]
bottom = "="
"##,
        )
        .unwrap();

        let spec = StyleSpec::from_overrides(&overrides);
        assert!(!spec.underlines_level(1));
        assert_eq!(spec.code_styles, Style::from_tokens(&["#00ff00"]));
        assert_eq!(*spec.header_style(2), Style::from_tokens(&["italic", "underline"]));
        assert_eq!(*spec.header_style(1), Style::from_tokens(&["bold", "brightWhite"]));
        assert_eq!(spec.code_border_chars.bottom, "=");
        assert_eq!(spec.code_border_chars.top, "─");
    }

    #[test]
    fn test_underline_levels_from_toml() {
        let all: StyleOverrides =
            toml::from_str("header_underline_levels = [1, 2, 3, 4, 5, 6]").unwrap();
        let spec = StyleSpec::from_overrides(&all);
        assert!(HEADER_LEVELS.all(|level| spec.underlines_level(level)));

        let none: StyleOverrides = toml::from_str("header_underline_levels = []").unwrap();
        let spec = StyleSpec::from_overrides(&none);
        assert!(HEADER_LEVELS.all(|level| !spec.underlines_level(level)));
        assert!(spec.header_underline);
    }
}
