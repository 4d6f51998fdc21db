use std::fmt;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::AppError;

/// Longest identifier accepted, in bytes.
pub const MAX_DOCUMENT_ID_LEN: usize = 512;

/// Path namespaces that never hold articles.
const NON_ARTICLE_PREFIXES: &[&str] = &[
    "Special:",
    "Talk:",
    "User:",
    "Wikipedia:",
    "File:",
    "Help:",
];

/// Identifier of a remote document (a URL path segment such as `Alan_Turing`).
///
/// Untrusted input: it is only ever used as a cache key and as a single
/// percent-encoded path segment of the request URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Validate and wrap a raw identifier.
    pub fn new(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(AppError::InvalidDocumentId("identifier is empty".into()));
        }
        if raw.len() > MAX_DOCUMENT_ID_LEN {
            return Err(AppError::InvalidDocumentId(format!(
                "identifier is {} bytes (max {MAX_DOCUMENT_ID_LEN})",
                raw.len()
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(AppError::InvalidDocumentId(
                "identifier contains control characters".into(),
            ));
        }
        let id = Self(raw);
        let decoded = id.decoded();
        if decoded == "." || decoded == ".." {
            return Err(AppError::InvalidDocumentId(format!(
                "'{}' is not a document",
                id.0
            )));
        }
        if decoded.chars().any(char::is_control) {
            return Err(AppError::InvalidDocumentId(
                "identifier encodes control characters".into(),
            ));
        }
        Ok(id)
    }

    /// Derive an identifier from an encyclopedia article URL.
    ///
    /// Example: `"https://en.wikipedia.org/wiki/Alan_Turing#Early_life"` → `"Alan_Turing"`
    pub fn from_article_url(article_url: &str) -> Result<Self, AppError> {
        let parsed = Url::parse(article_url)
            .map_err(|e| AppError::InvalidDocumentId(format!("invalid URL: {e}")))?;

        let slug = parsed
            .path()
            .strip_prefix("/wiki/")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::InvalidDocumentId(format!("{article_url} is not an article URL"))
            })?;

        if let Some(prefix) = NON_ARTICLE_PREFIXES.iter().find(|p| slug.starts_with(*p)) {
            return Err(AppError::InvalidDocumentId(format!(
                "{prefix} pages are not articles"
            )));
        }

        Self::new(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier percent-decoded once, as it should appear in a path segment.
    pub fn decoded(&self) -> String {
        urlencoding::decode(&self.0)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| self.0.clone())
    }

    /// Human-readable name derived from the identifier alone (`Alan_Turing` → `Alan Turing`).
    ///
    /// Used as identifying metadata when no summary could be extracted.
    pub fn readable_title(&self) -> String {
        self.decoded().replace('_', " ")
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for DocumentId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A title + summary pair extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExtractionResult {
    pub title: String,
    pub summary: String,
}

/// A cached extraction and the moment it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheEntry {
    pub result: ExtractionResult,
    pub fetched_at: DateTime<Utc>,
}

/// Why a stream stopped being read before the final extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The server finished sending the body.
    Completed,
    /// The wall-clock budget ran out.
    TimedOut,
    /// The buffer ceiling was reached.
    SizeCapped,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::TimedOut => write!(f, "timed_out"),
            StopReason::SizeCapped => write!(f, "size_capped"),
        }
    }
}

/// Diagnostic detail attached to [`FetchOutcome::Failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Connection, status or read failure.
    Transport(String),
    /// The payload never yielded a usable title + summary.
    Unextractable { stop: StopReason },
    /// The caller gave up on the request.
    Aborted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport(msg) => write!(f, "transport: {msg}"),
            FailureReason::Unextractable { stop } => {
                write!(f, "no summary found (stream {stop})")
            }
            FailureReason::Aborted => write!(f, "aborted"),
        }
    }
}

/// Result of one extraction request. Callers only ever branch on the two cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(ExtractionResult),
    Failure(FailureReason),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn into_result(self) -> Option<ExtractionResult> {
        match self {
            FetchOutcome::Success(result) => Some(result),
            FetchOutcome::Failure(_) => None,
        }
    }
}
