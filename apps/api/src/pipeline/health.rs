//! Health Prober — fresh per-dependency snapshot on every call.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::models::response::{HealthFailure, HealthReport, HealthResponse, HealthStatus};

use super::ResumePipeline;

pub const SERVICE_VERSION: &str = "1.0.0";
pub const HEALTHY: &str = "healthy";

impl ResumePipeline {
    /// Probes the compiler toolchain and the bucket concurrently. A probe that
    /// panics is recorded as unhealthy; it never aborts the snapshot.
    pub async fn health_check(&self) -> HealthResponse {
        info!("Performing health check...");

        let pipeline = self.clone();
        aggregate(async move { pipeline.collect_dependencies().await }).await
    }

    async fn collect_dependencies(&self) -> BTreeMap<String, String> {
        let compiler = Arc::clone(&self.compiler);
        let store = Arc::clone(&self.store);

        let (latex, s3) = tokio::join!(
            probe(
                "latex",
                async move { compiler.validate_packages().await },
                "missing packages"
            ),
            probe(
                "s3",
                async move { store.validate_access().await },
                "bucket access failed"
            ),
        );

        BTreeMap::from([
            // The generator has no cheap self-check.
            ("openai".to_string(), HEALTHY.to_string()),
            ("latex".to_string(), latex),
            ("s3".to_string(), s3),
        ])
    }
}

/// Runs `collect` on its own task. If the task dies, the whole snapshot is
/// reported as unhealthy with the failure text.
async fn aggregate<F>(collect: F) -> HealthResponse
where
    F: Future<Output = BTreeMap<String, String>> + Send + 'static,
{
    match tokio::spawn(collect).await {
        Ok(dependencies) => HealthResponse::Report(HealthReport {
            status: overall_status(&dependencies),
            timestamp: Utc::now(),
            version: SERVICE_VERSION.to_string(),
            dependencies,
        }),
        Err(e) => {
            let message = join_error_message(e);
            error!("Health check failed: {message}");
            HealthResponse::Failed(HealthFailure {
                status: HealthStatus::Unhealthy,
                timestamp: Utc::now(),
                error: message,
            })
        }
    }
}

/// Healthy only when every dependency reports exactly `healthy`.
pub fn overall_status(dependencies: &BTreeMap<String, String>) -> HealthStatus {
    if dependencies.values().all(|status| status == HEALTHY) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}

async fn probe<F>(name: &str, check: F, failure: &str) -> String
where
    F: Future<Output = bool> + Send + 'static,
{
    match tokio::spawn(check).await {
        Ok(true) => HEALTHY.to_string(),
        Ok(false) => {
            warn!("{name} probe failed: {failure}");
            format!("unhealthy: {failure}")
        }
        Err(e) => {
            let message = join_error_message(e);
            warn!("{name} probe crashed: {message}");
            format!("unhealthy: {message}")
        }
    }
}

fn join_error_message(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "task panicked".to_string())
}
