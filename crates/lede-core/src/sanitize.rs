//! Text clean-up for summaries lifted out of an escaped markdown payload.
//!
//! The source markdown sits inside a string literal, so newlines, quotes and
//! backslashes arrive escaped. Escapes are resolved before markup is stripped
//! because some delimiters only appear once unescaped.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Summaries longer than this are cut at a word boundary.
pub const MAX_SUMMARY_CHARS: usize = 400;

/// Anything shorter is not a usable summary.
pub const MIN_SUMMARY_CHARS: usize = 50;

pub const ELLIPSIS: &str = "...";

static ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\(?:u([0-9a-fA-F]{4})|([n"\\]))"#).expect("escape pattern")
});
static BACKSLASH_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\{2,}").expect("backslash run pattern"));
static ESCAPE_LOOKALIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\(u[0-9a-fA-F]{4}|[n"])"#).expect("escape lookalike pattern"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("link pattern"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("italic pattern"));
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("code pattern"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static TITLE_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\u([0-9a-fA-F]{4})|\\""#).expect("title escape pattern"));

/// Turn a raw escaped markdown fragment into plain single-line text.
pub fn sanitize(raw: &str) -> String {
    // One left-to-right pass so `\\n` stays a backslash followed by `n`.
    let text = ESCAPE_RE.replace_all(raw, |caps: &Captures| match (caps.get(1), caps.get(2)) {
        (Some(hex), _) => decode_unit(hex.as_str()),
        (None, Some(escaped)) if escaped.as_str() == "n" => " ".to_string(),
        (None, Some(escaped)) => escaped.as_str().to_string(),
        (None, None) => String::new(),
    });
    let text = LINK_RE.replace_all(&text, "$1");
    let text = BOLD_RE.replace_all(&text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = CODE_RE.replace_all(&text, "$1");
    // Output never contains an escape sequence, so a second pass leaves it alone.
    let text = BACKSLASH_RUN_RE.replace_all(&text, r"\");
    let text = ESCAPE_LOOKALIKE_RE.replace_all(&text, "$1");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// One `\uXXXX` code unit. Whitespace and control characters become a space;
/// lone surrogates are dropped.
fn decode_unit(hex: &str) -> String {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) if c.is_whitespace() || c.is_control() => " ".to_string(),
        Some(c) => c.to_string(),
        None => String::new(),
    }
}

/// Cap a summary at [`MAX_SUMMARY_CHARS`] without cutting a word in half.
///
/// Text within the limit is returned unchanged.
pub fn truncate_summary(text: &str) -> String {
    let Some((cut, _)) = text.char_indices().nth(MAX_SUMMARY_CHARS) else {
        return text.to_string();
    };
    let head = &text[..cut];

    // Back off to the last whitespace, unless a single giant word would leave
    // the summary under the minimum.
    let kept = match head.rfind(char::is_whitespace) {
        Some(pos) if head[..pos].trim_end().chars().count() >= MIN_SUMMARY_CHARS => {
            head[..pos].trim_end()
        }
        _ => head,
    };

    format!("{kept}{ELLIPSIS}")
}

/// Decode the escapes that survive in a heading (`\u0027`, `\"`).
pub fn unescape_title(raw: &str) -> String {
    TITLE_ESCAPE_RE
        .replace_all(raw, |caps: &Captures| match caps.get(1) {
            Some(hex) => u32::from_str_radix(hex.as_str(), 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string()),
            None => "\"".to_string(),
        })
        .into_owned()
}
