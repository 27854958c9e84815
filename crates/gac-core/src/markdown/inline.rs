//! Inline markdown: code spans, bold, italic, links.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::spec::StyleSpec;
use super::style::Style;

static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("code span pattern"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_]+)_").expect("italic pattern"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern"));

/// Applies inline styling in a fixed order: code spans, bold, italic, links.
///
/// Each pass runs once over the previous pass's output; a pass never
/// re-scans its own replacements.
pub fn render_inline(text: &str, spec: &StyleSpec) -> String {
    let bold = Style::from_tokens(&["bold"]);
    let italic = Style::from_tokens(&["italic"]);
    let underline = Style::from_tokens(&["underline"]);

    let out = CODE_SPAN
        .replace_all(text, |caps: &Captures| spec.inline_code_style.paint(&caps[1]))
        .into_owned();
    let out = BOLD
        .replace_all(&out, |caps: &Captures| bold.paint(&caps[1]))
        .into_owned();
    let out = ITALIC
        .replace_all(&out, |caps: &Captures| italic.paint(&caps[1]))
        .into_owned();
    LINK.replace_all(&out, |caps: &Captures| {
        format!("{} ({})", underline.paint(&caps[1]), &caps[2])
    })
    .into_owned()
}
