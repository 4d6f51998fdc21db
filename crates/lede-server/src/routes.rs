use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use lede_core::DocumentId;

use crate::dto::{HealthResponse, SummaryResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/summaries/{id}", get(get_summary))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Resolve a document to its title and lead-paragraph summary.
///
/// The router percent-decodes the path segment once, so `AC%2FDC` names the
/// single document `AC/DC`.
#[utoipa::path(
    get,
    path = "/v1/summaries/{id}",
    params(("id" = String, Path, description = "Document identifier, e.g. Alan_Turing")),
    responses(
        (status = 200, description = "Summary, or ok=false when none could be extracted", body = SummaryResponse),
        (status = 400, description = "Invalid document id", body = crate::dto::ErrorResponse),
    ),
    tag = "summaries"
)]
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let id = DocumentId::new(id)?;

    let outcome = state.coordinator.resolve(&id).await;
    Ok(Json(SummaryResponse::from_outcome(&id, outcome)))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        in_flight: state.coordinator.pending_requests(),
    })
}
