//! Content Generator — turns a validated resume request into LaTeX markup.
//!
//! Flow: serialize request → fill prompt template → one LLM call → trimmed markup.
//!
//! No retries. A failed or empty completion aborts the pipeline.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use crate::generation::prompts::{resume_prompt, RESUME_SYSTEM};
use crate::llm_client::{CompletionParams, LlmClient, LlmError};
use crate::models::resume::{ResumeData, ValidatedResumeRequest};

/// Low temperature keeps the model close to the supplied facts.
const GENERATION_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.2,
    max_tokens: 2048,
};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Opaque LaTeX text. Produced by the generator, consumed once by the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMarkup(String);

impl GeneratedMarkup {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("OpenAI request failed: {0}")]
    Upstream(LlmError),

    #[error("Empty response from OpenAI")]
    EmptyContent,
}

impl From<LlmError> for GenerationError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::EmptyContent => GenerationError::EmptyContent,
            other => GenerationError::Upstream(other),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The generation stage. Implement this to swap the model backend without
/// touching the orchestrator.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &ValidatedResumeRequest,
    ) -> Result<GeneratedMarkup, GenerationError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmContentGenerator — production implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmContentGenerator {
    llm: LlmClient,
}

impl LlmContentGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(
        &self,
        request: &ValidatedResumeRequest,
    ) -> Result<GeneratedMarkup, GenerationError> {
        let prompt = build_resume_prompt(request);

        let latex = self
            .llm
            .call_text(&prompt, RESUME_SYSTEM, GENERATION_PARAMS)
            .await
            .map_err(|e| {
                error!("OpenAI API error: {e}");
                GenerationError::from(e)
            })?;

        info!("Generated LaTeX content ({} chars)", latex.len());
        Ok(GeneratedMarkup::new(latex))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt building
// ────────────────────────────────────────────────────────────────────────────

/// Fills the generation template with the serialized request.
pub fn build_resume_prompt(request: &ValidatedResumeRequest) -> String {
    resume_prompt(
        &format_resume_data(request.form_data()),
        request.job_description(),
        request.template_style(),
    )
}

/// Renders every populated field as labelled plain text.
pub fn format_resume_data(data: &ResumeData) -> String {
    let mut lines = Vec::new();

    let info = &data.personal_info;
    lines.push(format!("Name: {}", info.name));
    lines.push(format!("Email: {}", info.email));
    let contact = [
        ("Phone", &info.phone),
        ("Location", &info.location),
        ("LinkedIn", &info.linkedin),
        ("GitHub", &info.github),
        ("Website", &info.website),
    ];
    for (label, value) in contact {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            lines.push(format!("{label}: {value}"));
        }
    }

    if let Some(summary) = data.summary.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("\nSummary: {summary}"));
    }

    lines.push(format!("\nSkills: {}", data.skills.join(", ")));

    if !data.work_experience.is_empty() {
        lines.push("\nWork Experience:".to_string());
        for exp in &data.work_experience {
            let end = exp.end_date.as_deref().unwrap_or("Present");
            lines.push(format!(
                "- {} at {} ({} - {})",
                exp.position, exp.company, exp.start_date, end
            ));
            for bullet in &exp.description {
                lines.push(format!("  • {bullet}"));
            }
        }
    }

    lines.push("\nEducation:".to_string());
    for edu in &data.education {
        let mut entry = format!("- {}", edu.degree);
        if let Some(field) = &edu.field {
            entry.push_str(&format!(" in {field}"));
        }
        entry.push_str(&format!(" from {}", edu.institution));
        if let Some(date) = &edu.graduation_date {
            entry.push_str(&format!(" ({date})"));
        }
        lines.push(entry);
    }

    if let Some(projects) = data.projects.as_ref().filter(|p| !p.is_empty()) {
        lines.push("\nProjects:".to_string());
        for proj in projects {
            lines.push(format!("- {}: {}", proj.name, proj.description));
            lines.push(format!("  Technologies: {}", proj.technologies.join(", ")));
        }
    }

    if let Some(certs) = data.certifications.as_ref().filter(|c| !c.is_empty()) {
        lines.push(format!("\nCertifications: {}", certs.join(", ")));
    }

    if let Some(langs) = data.languages.as_ref().filter(|l| !l.is_empty()) {
        lines.push(format!("\nLanguages: {}", langs.join(", ")));
    }

    lines.join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::fixtures::{sample_request, validated_request};
    use crate::models::resume::Project;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    #[test]
    fn test_format_includes_contact_lines_only_when_present() {
        let request = validated_request();
        let text = format_resume_data(request.form_data());
        assert!(text.contains("Name: John Doe"));
        assert!(text.contains("Phone: +1-555-0123"));
        assert!(!text.contains("Website:"));
    }

    #[test]
    fn test_format_marks_open_ended_roles_present() {
        let text = format_resume_data(validated_request().form_data());
        assert!(text.contains("- Senior Software Engineer at Tech Corp (2020-01 - Present)"));
        assert!(text.contains("  • Improved system performance by 40%"));
    }

    #[test]
    fn test_format_education_line() {
        let text = format_resume_data(validated_request().form_data());
        assert!(text.contains(
            "- Bachelor of Science in Computer Science from University of California (2019-05)"
        ));
    }

    #[test]
    fn test_format_optional_sections() {
        let mut request = sample_request();
        request.form_data.projects = Some(vec![Project {
            name: "resume-api".to_string(),
            description: "Tailored resume generation service".to_string(),
            technologies: vec!["Rust".to_string(), "LaTeX".to_string()],
            url: None,
            date: None,
        }]);
        request.form_data.certifications = Some(vec!["AWS SAA".to_string()]);
        request.form_data.languages = Some(vec![]);
        let text = format_resume_data(request.validate().unwrap().form_data());

        assert!(text.contains("Projects:\n- resume-api: Tailored resume generation service"));
        assert!(text.contains("  Technologies: Rust, LaTeX"));
        assert!(text.contains("Certifications: AWS SAA"));
        assert!(!text.contains("Languages:"));
    }

    #[test]
    fn test_prompt_contains_job_description_and_style() {
        let request = validated_request();
        let prompt = build_resume_prompt(&request);
        assert!(prompt.contains(request.job_description()));
        assert!(prompt.contains("TEMPLATE STYLE: modern"));
        assert!(!prompt.contains("{resume_data}"));
    }

    #[test]
    fn test_prompt_keeps_placeholder_text_from_user_fields() {
        let mut request = sample_request();
        request.form_data.summary = Some("I write {job_description} and {template_style}".into());
        let request = request.validate().unwrap();
        let prompt = build_resume_prompt(&request);

        assert!(prompt.contains("Summary: I write {job_description} and {template_style}"));
        assert_eq!(prompt.matches(request.job_description()).count(), 1);
        assert_eq!(prompt.matches("TEMPLATE STYLE: modern").count(), 1);
    }

    #[test]
    fn test_empty_llm_content_maps_to_empty_generation_error() {
        let err = GenerationError::from(LlmError::EmptyContent);
        assert!(matches!(err, GenerationError::EmptyContent));
        assert!(err.to_string().contains("OpenAI"));
    }

    #[tokio::test]
    async fn test_generate_returns_markup_from_completion() {
        let router = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                let user = body["messages"][1]["content"].as_str().unwrap_or_default();
                let content = if user.contains("Name: John Doe") {
                    "\\documentclass{moderncv}"
                } else {
                    ""
                };
                Json(json!({"choices": [{"message": {"content": content}}]}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let llm = LlmClient::new("sk-test".into(), format!("http://{addr}"), "gpt-test".into())
            .unwrap();
        let markup = LlmContentGenerator::new(llm)
            .generate(&validated_request())
            .await
            .unwrap();
        assert_eq!(markup.as_str(), "\\documentclass{moderncv}");
    }
}
