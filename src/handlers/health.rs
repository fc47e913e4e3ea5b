use axum::{extract::State, response::Json};
use once_cell::sync::Lazy;
use std::time::Instant;
use tracing::info;

use crate::error::AppResult;
use crate::models::{HealthResponse, StorageHealth};

use super::AppState;

/// Process start, forced in `main` so uptime counts from boot.
pub static STARTED_AT: Lazy<Instant> = Lazy::new(Instant::now);

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let storage_available = state.store.is_available();
    let processor_available = state.processor.is_available();

    let status = if storage_available && processor_available {
        "healthy"
    } else {
        "degraded"
    };

    let response = HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: STARTED_AT.elapsed().as_secs(),
        storage: StorageHealth {
            root: state.store.root_display(),
            available: storage_available,
        },
    };

    info!(status = status, storage_available = storage_available, "Health check completed");

    Ok(Json(response))
}
