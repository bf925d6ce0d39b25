use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::errors::{ErrorCode, FailureStep};

/// Success record returned by `generate_resume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeResponse {
    pub pdf_url: String,
    pub resume_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub resume_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub step: FailureStep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: ErrorCode,
    pub details: ErrorDetails,
}

/// Failure record: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorResponse,
}

/// What `generate_resume` hands back. It never raises; failures are data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationOutcome {
    Success(ResumeResponse),
    Failure(ErrorEnvelope),
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Health
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Per-dependency health snapshot. Recomputed on every probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub dependencies: BTreeMap<String, String>,
}

/// Reported when the aggregation itself could not complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthFailure {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HealthResponse {
    Report(HealthReport),
    Failed(HealthFailure),
}

impl HealthResponse {
    pub fn status(&self) -> HealthStatus {
        match self {
            HealthResponse::Report(report) => report.status,
            HealthResponse::Failed(failure) => failure.status,
        }
    }
}
