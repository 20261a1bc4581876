use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::config::Permission;
use crate::pipeline::{BatchSummary, PipelineStatus};
use crate::window::WindowAggregate;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestQuery {
    /// Only return the record for this object
    pub object_id: Option<String>,
}

/// Newest enriched record per object, as JSON objects in the record layout
/// written to `processed/`.
#[utoipa::path(
    get,
    path = "/api/pipeline/latest",
    tag = "pipeline",
    params(LatestQuery),
    responses(
        (status = 200, description = "Latest enriched record per object"),
        (status = 404, description = "No record for the requested object", body = ErrorResponse),
        (status = 500, description = "Records could not be serialized", body = ErrorResponse)
    )
)]
pub async fn latest(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let records = match query.object_id {
        Some(id) => vec![state
            .memory
            .latest(&id)
            .ok_or(ApiError::NotFound("object_not_found"))?],
        None => state.memory.latest_all(),
    };

    serde_json::to_value(records)
        .map(Json)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[utoipa::path(
    get,
    path = "/api/pipeline/windows",
    tag = "pipeline",
    responses(
        (status = 200, description = "Recently closed windows, oldest first", body = Vec<WindowAggregate>)
    )
)]
pub async fn windows(State(state): State<AppState>) -> Json<Vec<WindowAggregate>> {
    Json(state.memory.windows())
}

#[utoipa::path(
    get,
    path = "/api/pipeline/stats",
    tag = "pipeline",
    responses(
        (status = 200, description = "Pipeline counters and watermark", body = PipelineStatus)
    )
)]
pub async fn stats(State(state): State<AppState>) -> Json<PipelineStatus> {
    let driver = state.driver.lock().await;
    Json(driver.pipeline().status())
}

/// Closes every open window regardless of the watermark.
#[utoipa::path(
    post,
    path = "/api/pipeline/flush",
    tag = "pipeline",
    responses(
        (status = 200, description = "Windows closed", body = BatchSummary),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("api_key" = []))
)]
pub async fn flush(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<BatchSummary>> {
    require_permission(&user, Permission::FlushWindows)?;

    let mut driver = state.driver.lock().await;
    let report = driver.flush();
    log::info!(
        "{} flushed {} window(s)",
        user.name,
        report.windows.len() + report.failed_windows
    );

    Ok(Json(report.summary()))
}
