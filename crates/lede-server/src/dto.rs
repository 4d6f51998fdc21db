use serde::Serialize;

use lede_core::{DocumentId, FetchOutcome};

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Result of a summary lookup.
///
/// A document without an extractable summary is not an HTTP error: the
/// response carries `ok: false`, a title derived from the id, and no summary.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SummaryResponse {
    pub ok: bool,
    /// The identifier as requested
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
}

impl SummaryResponse {
    pub fn from_outcome(id: &DocumentId, outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Success(result) => Self {
                ok: true,
                id: id.to_string(),
                title: result.title,
                summary: Some(result.summary),
            },
            FetchOutcome::Failure(_) => Self {
                ok: false,
                id: id.to_string(),
                title: id.readable_title(),
                summary: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Upstream fetches currently in progress
    pub in_flight: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
