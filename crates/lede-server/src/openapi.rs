use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lede API",
        version = "0.1.0",
        description = "Title and lead-paragraph summaries of encyclopedia articles."
    ),
    paths(crate::routes::get_summary, crate::routes::health),
    components(schemas(
        crate::dto::SummaryResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "summaries", description = "Article summaries"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
