//! Axum route handler for resume generation.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

use crate::errors::AppError;
use crate::models::resume::ResumeRequest;
use crate::models::response::GenerationOutcome;
use crate::pipeline::errors::ErrorCode;
use crate::state::AppState;

/// POST /api/v1/resumes
///
/// Validates the request, then runs generate → compile → upload. Pipeline
/// failures come back as the `{"error": {...}}` record with a status chosen
/// by error code.
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    payload: Result<Json<ResumeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GenerationOutcome>), AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = request.validate()?;

    let outcome = state.pipeline.generate_resume(request).await;
    let status = match &outcome {
        GenerationOutcome::Success(_) => StatusCode::OK,
        GenerationOutcome::Failure(envelope) => status_for(envelope.error.error_code),
    };
    Ok((status, Json(outcome)))
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::OpenaiError | ErrorCode::S3Error => StatusCode::BAD_GATEWAY,
        ErrorCode::LatexError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::models::resume::fixtures::sample_request;
    use crate::pipeline::testing::{StubCompiler, StubGenerator, StubStore};
    use crate::routes::test_support::{app, json_body};

    fn post_json(body: String) -> Request<Body> {
        Request::post("/api/v1/resumes")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_signed_url() {
        let store = Arc::new(StubStore::default());
        let body = serde_json::to_string(&sample_request()).unwrap();

        let response = app(StubGenerator::default(), StubCompiler::default(), store.clone())
            .oneshot(post_json(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let resume_id = body["resume_id"].as_str().unwrap().to_string();
        assert!(body["pdf_url"].as_str().unwrap().contains(&resume_id));
        assert_eq!(store.uploaded_ids()[0].to_string(), resume_id);
    }

    #[tokio::test]
    async fn test_compile_failure_returns_error_record() {
        let compiler = StubCompiler {
            fail: true,
            ..Default::default()
        };
        let body = serde_json::to_string(&sample_request()).unwrap();

        let response = app(StubGenerator::default(), compiler, Arc::new(StubStore::default()))
            .oneshot(post_json(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"]["error_code"], "LATEX_ERROR");
        assert_eq!(body["error"]["details"]["step"], "pdf_compilation");
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_pipeline() {
        let store = Arc::new(StubStore::default());
        let mut request = sample_request();
        request.job_description = "too short".to_string();
        let body = serde_json::to_string(&request).unwrap();

        let response = app(StubGenerator::default(), StubCompiler::default(), store.clone())
            .oneshot(post_json(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["fields"][0]["field"], "job_description");
        assert_eq!(store.uploads(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let response = app(
            StubGenerator::default(),
            StubCompiler::default(),
            Arc::new(StubStore::default()),
        )
        .oneshot(post_json("{not json".to_string()))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[test]
    fn test_status_for_codes() {
        assert_eq!(status_for(ErrorCode::ValidationError), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorCode::OpenaiError), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorCode::LatexError), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
