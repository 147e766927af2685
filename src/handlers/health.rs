use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::storage::BackendKind;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub storage: StorageHealth,
}

#[derive(Debug, Serialize)]
pub struct StorageHealth {
    pub backend: BackendKind,
    pub healthy: bool,
}

/// Liveness plus a storage probe; reports `degraded` rather than failing.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let healthy = match state.storage.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Storage health check failed: {}", e);
            false
        }
    };

    Json(HealthStatus {
        status: if healthy { "ok" } else { "degraded" },
        timestamp: Utc::now(),
        storage: StorageHealth {
            backend: state.storage.backend(),
            healthy,
        },
    })
}
