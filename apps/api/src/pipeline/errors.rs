//! Public error taxonomy for the resume pipeline.
//!
//! Each stage raises its own error type; `PipelineError` folds them into one
//! enum whose variant fixes the public `ErrorCode` and `FailureStep`. Errors of
//! unknown origin fall back to the message-based classifier.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::generator::GenerationError;
use crate::render::compiler::CompilationError;
use crate::storage::s3_store::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "OPENAI_ERROR")]
    OpenaiError,
    #[serde(rename = "LATEX_ERROR")]
    LatexError,
    #[serde(rename = "S3_ERROR")]
    S3Error,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::OpenaiError => "OPENAI_ERROR",
            ErrorCode::LatexError => "LATEX_ERROR",
            ErrorCode::S3Error => "S3_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Message-based classification. Pure and total: markers are checked in
    /// order `openai`, `latex`/`compile`, `s3`, then the validation flag.
    pub fn classify(message: &str, is_validation: bool) -> Self {
        let message = message.to_lowercase();
        if message.contains("openai") {
            ErrorCode::OpenaiError
        } else if message.contains("latex") || message.contains("compile") {
            ErrorCode::LatexError
        } else if message.contains("s3") {
            ErrorCode::S3Error
        } else if is_validation {
            ErrorCode::ValidationError
        } else {
            ErrorCode::InternalError
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStep {
    ContentGeneration,
    PdfCompilation,
    FileUpload,
    Unknown,
}

impl FailureStep {
    /// Message-based classification; `api` counts as a generation marker.
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("openai") || message.contains("api") {
            FailureStep::ContentGeneration
        } else if message.contains("latex") || message.contains("compile") {
            FailureStep::PdfCompilation
        } else if message.contains("s3") || message.contains("upload") {
            FailureStep::FileUpload
        } else {
            FailureStep::Unknown
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Input or output rejected by a guard, e.g. an oversized document.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::Generation(_) => ErrorCode::OpenaiError,
            PipelineError::Compilation(_) => ErrorCode::LatexError,
            PipelineError::Storage(_) => ErrorCode::S3Error,
            PipelineError::Validation(_) => ErrorCode::ValidationError,
            PipelineError::Internal(e) => ErrorCode::classify(&format!("{e:#}"), false),
        }
    }

    pub fn step(&self) -> FailureStep {
        match self {
            PipelineError::Generation(_) => FailureStep::ContentGeneration,
            PipelineError::Compilation(_) => FailureStep::PdfCompilation,
            PipelineError::Storage(_) => FailureStep::FileUpload,
            PipelineError::Validation(_) => FailureStep::Unknown,
            PipelineError::Internal(e) => FailureStep::classify(&format!("{e:#}")),
        }
    }
}
