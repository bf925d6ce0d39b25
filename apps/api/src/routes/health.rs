use axum::{extract::State, http::StatusCode, Json};

use crate::models::response::{HealthResponse, HealthStatus};
use crate::state::AppState;

/// GET /health
/// Probes every dependency. Degraded still answers 200; only a failed
/// aggregation answers 503.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = state.pipeline.health_check().await;
    (status_for(&health), Json(health))
}

pub fn status_for(health: &HealthResponse) -> StatusCode {
    match health.status() {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use chrono::Utc;
    use tower::ServiceExt;

    use super::*;
    use crate::models::response::HealthFailure;
    use crate::pipeline::testing::{Probe, StubCompiler, StubGenerator, StubStore};
    use crate::routes::test_support::{app, json_body};

    #[test]
    fn test_failed_snapshot_maps_to_service_unavailable() {
        let failed = HealthResponse::Failed(HealthFailure {
            status: HealthStatus::Unhealthy,
            timestamp: Utc::now(),
            error: "task cancelled".to_string(),
        });
        assert_eq!(status_for(&failed), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_reports_dependencies() {
        let store = Arc::new(StubStore {
            access: Probe::Fail,
            ..Default::default()
        });
        let response = app(StubGenerator::default(), StubCompiler::default(), store)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["version"], "1.0.0");
        assert_eq!(body["dependencies"]["latex"], "healthy");
        assert_eq!(body["dependencies"]["s3"], "unhealthy: bucket access failed");
    }
}
