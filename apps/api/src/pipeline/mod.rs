//! Orchestrator — generate → compile → upload for one resume request.
//!
//! Flow: mint resume_id → Generating → Compiling → size guard → Uploading → Done.
//!
//! `generate_resume` never fails: any stage error, and any panic inside a
//! stage, comes back as a structured failure record carrying the public
//! error code and the step that failed. No retries.

pub mod errors;
pub mod health;

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::generation::generator::ContentGenerator;
use crate::models::response::{
    ErrorDetails, ErrorEnvelope, ErrorResponse, GenerationOutcome, ResumeResponse,
};
use crate::models::resume::ValidatedResumeRequest;
use crate::render::compiler::DocumentCompiler;
use crate::storage::s3_store::ArtifactStore;

use self::errors::PipelineError;

/// Where a request currently is. `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generating,
    Compiling,
    Uploading,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Generating => "generating",
            Stage::Compiling => "compiling",
            Stage::Uploading => "uploading",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The three stages plus the output-size limit. Cheap to clone; every
/// stage is shared behind an `Arc`.
#[derive(Clone)]
pub struct ResumePipeline {
    generator: Arc<dyn ContentGenerator>,
    compiler: Arc<dyn DocumentCompiler>,
    store: Arc<dyn ArtifactStore>,
    max_document_mb: u64,
}

impl ResumePipeline {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        compiler: Arc<dyn DocumentCompiler>,
        store: Arc<dyn ArtifactStore>,
        max_document_mb: u64,
    ) -> Self {
        Self {
            generator,
            compiler,
            store,
            max_document_mb,
        }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn max_document_bytes(&self) -> usize {
        (self.max_document_mb as usize).saturating_mul(1024 * 1024)
    }

    /// Runs the full pipeline for one validated request.
    pub async fn generate_resume(&self, request: ValidatedResumeRequest) -> GenerationOutcome {
        let resume_id = Uuid::new_v4();
        let span = info_span!("generate_resume", %resume_id);

        // Run on its own task so a panicking stage surfaces as a JoinError.
        let pipeline = self.clone();
        let task = tokio::spawn(
            async move { pipeline.run_stages(resume_id, &request).await }.instrument(span.clone()),
        );
        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::Internal(anyhow::anyhow!(
                "pipeline task aborted: {e}"
            ))),
        };

        let _entered = span.enter();
        match result {
            Ok(response) => {
                info!("Successfully generated resume {resume_id}");
                GenerationOutcome::Success(response)
            }
            Err(e) => {
                error!(stage = %Stage::Failed, "Resume generation failed for {resume_id}: {e}");
                GenerationOutcome::Failure(ErrorEnvelope {
                    error: ErrorResponse {
                        error: e.to_string(),
                        error_code: e.code(),
                        details: ErrorDetails {
                            resume_id,
                            timestamp: Utc::now(),
                            step: e.step(),
                        },
                    },
                })
            }
        }
    }

    async fn run_stages(
        &self,
        resume_id: Uuid,
        request: &ValidatedResumeRequest,
    ) -> Result<ResumeResponse, PipelineError> {
        info!(stage = %Stage::Generating, "Generating LaTeX content...");
        let markup = self.generator.generate(request).await?;

        info!(stage = %Stage::Compiling, "Compiling LaTeX to PDF...");
        let document = self.compiler.compile(&markup).await?;

        if document.len() > self.max_document_bytes() {
            return Err(PipelineError::Validation(format!(
                "Generated PDF exceeds maximum size of {}MB",
                self.max_document_mb
            )));
        }

        info!(stage = %Stage::Uploading, "Uploading PDF to S3...");
        let artifact = self.store.upload(document, Some(resume_id)).await?;

        info!(stage = %Stage::Done, "Stored resume at {}", artifact.key);
        Ok(ResumeResponse {
            pdf_url: artifact.url,
            resume_id,
            generated_at: Utc::now(),
            expires_at: artifact.expires_at,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test stages
// ────────────────────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::models::resume::fixtures::validated_request;
    use crate::pipeline::errors::{ErrorCode, FailureStep};

    fn failure(outcome: GenerationOutcome) -> ErrorResponse {
        match outcome {
            GenerationOutcome::Failure(envelope) => envelope.error,
            GenerationOutcome::Success(ok) => panic!("expected failure, got {ok:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_uses_one_resume_id_throughout() {
        let generator = Arc::new(StubGenerator::default());
        let compiler = Arc::new(StubCompiler::default());
        let store = Arc::new(StubStore::default());

        let outcome = pipeline(&generator, &compiler, &store)
            .generate_resume(validated_request())
            .await;

        let GenerationOutcome::Success(response) = outcome else {
            panic!("expected success");
        };
        assert_eq!(store.uploaded_ids(), vec![response.resume_id]);
        assert!(response.pdf_url.contains(&response.resume_id.to_string()));
        let ttl = response.expires_at - response.generated_at;
        assert!(ttl > chrono::Duration::hours(23) && ttl <= chrono::Duration::hours(24));
        assert_eq!((generator.calls(), compiler.calls()), (1, 1));
    }

    #[tokio::test]
    async fn test_generator_failure_skips_later_stages() {
        let generator = Arc::new(StubGenerator {
            fail: true,
            ..Default::default()
        });
        let compiler = Arc::new(StubCompiler::default());
        let store = Arc::new(StubStore::default());

        let err = failure(
            pipeline(&generator, &compiler, &store)
                .generate_resume(validated_request())
                .await,
        );

        assert_eq!(err.error_code, ErrorCode::OpenaiError);
        assert_eq!(err.details.step, FailureStep::ContentGeneration);
        assert!(err.error.contains("Rate limit reached"));
        assert_eq!(compiler.calls(), 0);
        assert_eq!(store.uploads(), 0);
    }

    #[tokio::test]
    async fn test_compiler_failure_skips_upload() {
        let generator = Arc::new(StubGenerator::default());
        let compiler = Arc::new(StubCompiler {
            fail: true,
            ..Default::default()
        });
        let store = Arc::new(StubStore::default());

        let err = failure(
            pipeline(&generator, &compiler, &store)
                .generate_resume(validated_request())
                .await,
        );

        assert_eq!(err.error_code, ErrorCode::LatexError);
        assert_eq!(err.details.step, FailureStep::PdfCompilation);
        assert_eq!(store.uploads(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_reports_upload_step() {
        let generator = Arc::new(StubGenerator::default());
        let compiler = Arc::new(StubCompiler::default());
        let store = Arc::new(StubStore {
            fail: true,
            ..Default::default()
        });

        let err = failure(
            pipeline(&generator, &compiler, &store)
                .generate_resume(validated_request())
                .await,
        );

        assert_eq!(err.error_code, ErrorCode::S3Error);
        assert_eq!(err.details.step, FailureStep::FileUpload);
        assert_eq!(store.uploaded_ids(), vec![err.details.resume_id]);
    }

    #[tokio::test]
    async fn test_oversized_document_never_reaches_store() {
        let generator = Arc::new(StubGenerator::default());
        let compiler = Arc::new(StubCompiler {
            output_bytes: 6 * 1024 * 1024,
            ..Default::default()
        });
        let store = Arc::new(StubStore::default());

        let err = failure(
            pipeline(&generator, &compiler, &store)
                .generate_resume(validated_request())
                .await,
        );

        assert!(err.error.contains("exceeds maximum size"));
        assert_eq!(err.error, "Generated PDF exceeds maximum size of 5MB");
        assert_eq!(err.error_code, ErrorCode::ValidationError);
        assert_eq!(store.uploads(), 0);
    }

    #[tokio::test]
    async fn test_document_at_exact_limit_is_uploaded() {
        let generator = Arc::new(StubGenerator::default());
        let compiler = Arc::new(StubCompiler {
            output_bytes: 5 * 1024 * 1024,
            ..Default::default()
        });
        let store = Arc::new(StubStore::default());

        let outcome = pipeline(&generator, &compiler, &store)
            .generate_resume(validated_request())
            .await;

        assert!(outcome.is_success());
        assert_eq!(store.uploads(), 1);
    }

    #[tokio::test]
    async fn test_panicking_stage_becomes_internal_failure() {
        let generator = Arc::new(StubGenerator {
            panic: true,
            ..Default::default()
        });
        let compiler = Arc::new(StubCompiler::default());
        let store = Arc::new(StubStore::default());

        let err = failure(
            pipeline(&generator, &compiler, &store)
                .generate_resume(validated_request())
                .await,
        );

        assert_eq!(err.error_code, ErrorCode::InternalError);
        assert_eq!(compiler.calls(), 0);
    }

    #[test]
    fn test_max_document_bytes() {
        let pipeline = pipeline(
            &Arc::new(StubGenerator::default()),
            &Arc::new(StubCompiler::default()),
            &Arc::new(StubStore::default()),
        );
        assert_eq!(pipeline.max_document_bytes(), 5 * 1024 * 1024);
    }
}
