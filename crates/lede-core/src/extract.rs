//! Incremental title + summary extraction from a partially received payload.
//!
//! The extractor is called with an ever-growing buffer. `None` always means
//! "not enough data yet": no heading, or a first paragraph that is still
//! too short. The caller resolves both the same way, by reading more bytes.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{DocumentId, ExtractionResult};
use crate::sanitize::{MIN_SUMMARY_CHARS, sanitize, truncate_summary, unescape_title};

/// Scan window used when the first paragraph has not been terminated yet.
pub const PARAGRAPH_FALLBACK_CHARS: usize = 1000;

/// Escaped blank line separating markdown blocks inside the payload.
const ESCAPED_BLANK_LINE: &str = r"\n\n";

/// Markers where article text gives way to trailing script data.
const TRAILING_DATA_MARKERS: &[&str] = &["\"])", "</script", "<script"];

/// `# Title` followed by an escaped blank line. The title may carry `\uXXXX`
/// and `\"` escapes but no other backslash and no raw newline.
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"# ((?:[^\n\\]|\\u[0-9a-fA-F]{4}|\\"){3,})\\n\\n"#).expect("heading pattern")
});

/// `\uXXXX` escape cut off by the end of the buffer.
static PARTIAL_UNICODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u[0-9a-fA-F]{0,3}$").expect("partial unicode pattern"));

/// Raw (still escaped) title and first paragraph located in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located<'a> {
    pub raw_title: &'a str,
    pub raw_paragraph: &'a str,
}

/// Finds the heading and first paragraph in a raw buffer.
///
/// Kept separate from sanitizing and streaming so the matching strategy can
/// change on its own.
pub trait Locator: Send + Sync + Clone {
    fn locate<'a>(&self, buffer: &'a str) -> Option<Located<'a>>;
}

/// Locates a markdown `# Heading` embedded in an escaped string literal.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadingLocator;

impl Locator for HeadingLocator {
    fn locate<'a>(&self, buffer: &'a str) -> Option<Located<'a>> {
        let caps = HEADING_RE.captures(buffer)?;
        let heading = caps.get(0)?;
        let raw_title = caps.get(1)?.as_str();

        let after = &buffer[heading.end()..];
        let (mut paragraph, terminated) = match after.find(ESCAPED_BLANK_LINE) {
            Some(end) => (&after[..end], true),
            None => (prefix_chars(after, PARAGRAPH_FALLBACK_CHARS), false),
        };

        for marker in TRAILING_DATA_MARKERS {
            if let Some(pos) = paragraph.find(marker) {
                paragraph = &paragraph[..pos];
            }
        }
        if !terminated {
            paragraph = trim_partial_tail(paragraph);
        }

        Some(Located {
            raw_title,
            raw_paragraph: paragraph,
        })
    }
}

/// Turns located raw text into a clean [`ExtractionResult`].
#[derive(Debug, Default, Clone)]
pub struct Extractor<L = HeadingLocator> {
    locator: L,
}

impl Extractor<HeadingLocator> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: Locator> Extractor<L> {
    pub fn with_locator(locator: L) -> Self {
        Self { locator }
    }

    /// Try to produce a title + summary from what has been received so far.
    pub fn try_extract(&self, buffer: &str, id: &DocumentId) -> Option<ExtractionResult> {
        let located = self.locator.locate(buffer)?;

        let text = sanitize(located.raw_paragraph);
        if text.chars().count() < MIN_SUMMARY_CHARS {
            tracing::trace!(%id, chars = text.chars().count(), "First paragraph too short so far");
            return None;
        }

        let title = unescape_title(located.raw_title).trim().to_string();
        if title.is_empty() {
            return None;
        }

        Some(ExtractionResult {
            title,
            summary: truncate_summary(&text),
        })
    }
}

/// Drop an escape sequence or data marker split by the end of the window.
fn trim_partial_tail(mut text: &str) -> &str {
    for marker in TRAILING_DATA_MARKERS {
        let Some(len) = (1..marker.len()).rev().find(|&len| text.ends_with(&marker[..len])) else {
            continue;
        };
        let cut = text.len() - len;
        // An escaped quote is article text, not the end of the string literal.
        if !(marker.starts_with('"') && ends_escaped(&text[..cut])) {
            text = &text[..cut];
        }
    }

    if let Some(m) = PARTIAL_UNICODE_RE.find(text)
        && !ends_escaped(&text[..m.start()])
    {
        text = &text[..m.start()];
    }

    if ends_escaped(text) {
        text = &text[..text.len() - 1];
    }
    text
}

/// True when `s` ends in a backslash that is not itself escaped.
fn ends_escaped(s: &str) -> bool {
    s.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
