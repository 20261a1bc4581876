use axum::{routing::get, routing::post, Router};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::pipeline::{Driver, PipelineError};
use crate::sink::MemorySink;
use crate::source::{Simulator, SourceError};

use super::api::pipeline as pipeline_handlers;
use super::api::samples as sample_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("simulator: {0}")]
    Source(#[from] SourceError),
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/samples", post(sample_handlers::ingest))
        .route("/api/pipeline/latest", get(pipeline_handlers::latest))
        .route("/api/pipeline/windows", get(pipeline_handlers::windows))
        .route("/api/pipeline/stats", get(pipeline_handlers::stats))
        .route("/api/pipeline/flush", post(pipeline_handlers::flush))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config, clean_checkpoint: bool) -> Result<(), ServerError> {
    let bind_addr = config.web.bind.clone();
    let memory = MemorySink::new(config.web.window_history);
    let driver = Driver::from_config(&config, clean_checkpoint)?.with_sink(Box::new(memory.clone()));
    let driver = Arc::new(Mutex::new(driver));

    if let Some(sim_config) = &config.simulator {
        let object_id = sim_config
            .object_id
            .clone()
            .unwrap_or_else(|| config.pipeline.default_object_id.clone());
        let simulator = Simulator::from_tle_file(&sim_config.tle, object_id)?;
        log::info!(
            "Simulating {} every {}",
            simulator.object_name().unwrap_or("unnamed object"),
            humantime::format_duration(sim_config.interval)
        );
        tokio::spawn(run_simulator(simulator, sim_config.interval, driver.clone()));
    }

    let state = AppState {
        config: Arc::new(config),
        driver,
        memory,
    };

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn run_simulator(
    simulator: Simulator,
    period: std::time::Duration,
    driver: Arc<Mutex<Driver>>,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let sample = match simulator.sample_at(Utc::now()) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Simulator failed: {}", e);
                continue;
            }
        };

        let report = driver.lock().await.run_batch(vec![sample]);
        for rejection in &report.rejected {
            log::warn!("Simulated sample rejected: {}", rejection.reason);
        }
    }
}
