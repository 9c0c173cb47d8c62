// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Data directory availability.
    pub storage: String,
    /// Signing-key cache state ("ok" when a fresh key set is cached,
    /// "cold" when the next verification will fetch it).
    pub jwks: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is running", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "A dependency is unavailable", body = ReadyResponse),
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let storage = match state.storage.health_check() {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::error!(error = %e, "storage readiness check failed");
            "unavailable".to_string()
        }
    };

    let jwks = if state.jwks.is_cached().await {
        "ok".to_string()
    } else {
        "cold".to_string()
    };

    let degraded = storage != "ok";
    let response = ReadyResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            storage,
            jwks,
        },
    };

    let status = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok() {
        let response = health().await;
        assert_eq!(response.0.status, "ok");
    }
}
