use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::info;

use crate::handlers::AppState;
use crate::models::{DelegateStatus, HealthResponse};

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let pipeline = &state.pipeline;
    let scratch_ready = pipeline.scratch().is_ready();
    let delegate_available = pipeline.delegate().is_available();

    let status = if scratch_ready && delegate_available {
        "healthy"
    } else {
        "degraded"
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        scratch_ready,
        staged_files: pipeline.scratch().staged_count(),
        delegate: DelegateStatus {
            name: pipeline.delegate().name().to_string(),
            available: delegate_available,
        },
    };

    info!(
        status = status,
        scratch_ready = scratch_ready,
        delegate_available = delegate_available,
        "Health check completed"
    );

    Json(response)
}

/// Readiness check endpoint: ready once scratch space exists.
pub async fn ready_handler(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    if state.pipeline.scratch().is_ready() {
        Ok(StatusCode::OK)
    } else {
        info!("Readiness check failed - scratch directory missing");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
