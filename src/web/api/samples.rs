use axum::{extract::State, Json};
use serde_json::Value;

use crate::config::Permission;
use crate::pipeline::BatchSummary;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};

/// Split the body into entries. Only invalid JSON fails the request; entries
/// with the wrong shape are rejected one by one by the pipeline.
pub fn parse_body(body: &str) -> Result<Vec<Value>, ApiError> {
    match serde_json::from_str::<Value>(body).map_err(|e| ApiError::Validation(e.to_string()))? {
        Value::Array(items) => Ok(items),
        value => Ok(vec![value]),
    }
}

/// Accepts one position sample or an array of them as a single micro-batch.
#[utoipa::path(
    post,
    path = "/api/samples",
    tag = "samples",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Batch processed", body = BatchSummary),
        (status = 400, description = "Body is not JSON", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("api_key" = []))
)]
pub async fn ingest(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: String,
) -> ApiResult<Json<BatchSummary>> {
    require_permission(&user, Permission::IngestSamples)?;

    let samples = parse_body(&body)?;
    let count = samples.len();

    let mut driver = state.driver.lock().await;
    let report = driver.run_json(samples);
    log::debug!("{} submitted {} sample(s)", user.name, count);

    Ok(Json(report.summary()))
}
