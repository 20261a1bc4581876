use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::error::ErrorResponse;
use super::api::pipeline::LatestQuery;
use crate::pipeline::{BatchSummary, PipelineStats, PipelineStatus, Rejection};
use crate::window::WindowAggregate;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::samples::ingest,
        super::api::pipeline::latest,
        super::api::pipeline::windows,
        super::api::pipeline::stats,
        super::api::pipeline::flush,
    ),
    components(
        schemas(
            BatchSummary,
            Rejection,
            PipelineStats,
            PipelineStatus,
            WindowAggregate,
            LatestQuery,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "orbitstream API",
        description = "Position sample ingestion and windowed orbital metrics",
        version = "0.1.0"
    ),
    tags(
        (name = "samples", description = "Sample ingestion"),
        (name = "pipeline", description = "Pipeline output and state")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
