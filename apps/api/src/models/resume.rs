//! Resume request records and the validation gate that runs before the pipeline.
//!
//! `ResumeRequest` is what arrives over the wire. The pipeline only accepts
//! `ValidatedResumeRequest`, which can only be obtained through `validate()`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TEMPLATE_STYLE: &str = "modern";

const JOB_DESCRIPTION_MIN_CHARS: usize = 50;
const JOB_DESCRIPTION_MAX_CHARS: usize = 5000;

// ────────────────────────────────────────────────────────────────────────────
// Wire records
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    pub start_date: String,
    /// Absent means the role is current.
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub field: Option<String>,
    pub graduation_date: Option<String>,
    pub gpa: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub url: Option<String>,
    pub date: Option<String>,
}

/// The candidate's structured resume content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeData {
    pub personal_info: PersonalInfo,
    pub summary: Option<String>,
    pub skills: Vec<String>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
    pub projects: Option<Vec<Project>>,
    pub certifications: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
}

/// Request body for resume generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRequest {
    pub form_data: ResumeData,
    pub job_description: String,
    pub template_style: Option<String>,
}

/// A request that passed every field rule. Immutable; lives for one generation.
#[derive(Debug, Clone)]
pub struct ValidatedResumeRequest {
    form_data: ResumeData,
    job_description: String,
    template_style: String,
}

impl ValidatedResumeRequest {
    pub fn form_data(&self) -> &ResumeData {
        &self.form_data
    }

    /// Trimmed job description.
    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn template_style(&self) -> &str {
        &self.template_style
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Error)]
#[error("Invalid resume request: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects every violation instead of stopping at the first one.
#[derive(Default)]
struct Checker {
    violations: Vec<FieldViolation>,
}

impl Checker {
    fn fail(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    fn text(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.fail(field, format!("must be at least {min} characters"));
        } else if len > max {
            self.fail(field, format!("must be at most {max} characters"));
        }
    }

    fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.text(field, value, 0, max);
        }
    }

    fn count(&mut self, field: &str, len: usize, min: usize, max: usize) {
        if len < min {
            self.fail(field, format!("requires at least {min} item(s)"));
        } else if len > max {
            self.fail(field, format!("allows at most {max} items"));
        }
    }
}

/// `local@domain.tld`: one `@`, and a dot with text on both sides somewhere
/// in the domain.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("email pattern is a valid regex")
});

fn is_plausible_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

impl ResumeRequest {
    /// Runs every field rule and returns the validated request, or all violations.
    pub fn validate(self) -> Result<ValidatedResumeRequest, ValidationError> {
        let mut check = Checker::default();
        let data = &self.form_data;

        let info = &data.personal_info;
        check.text("personal_info.name", &info.name, 2, 100);
        if !is_plausible_email(&info.email) {
            check.fail("personal_info.email", "must be a valid email address");
        }
        check.optional_text("personal_info.phone", info.phone.as_deref(), 20);
        check.optional_text("personal_info.location", info.location.as_deref(), 100);
        check.optional_text("personal_info.linkedin", info.linkedin.as_deref(), 200);
        check.optional_text("personal_info.github", info.github.as_deref(), 200);
        check.optional_text("personal_info.website", info.website.as_deref(), 200);

        check.optional_text("summary", data.summary.as_deref(), 500);
        check.count("skills", data.skills.len(), 1, 50);

        check.count("work_experience", data.work_experience.len(), 0, 20);
        for (i, exp) in data.work_experience.iter().enumerate() {
            let at = |f: &str| format!("work_experience[{i}].{f}");
            check.text(&at("company"), &exp.company, 1, 100);
            check.text(&at("position"), &exp.position, 1, 100);
            check.text(&at("start_date"), &exp.start_date, 0, 20);
            check.optional_text(&at("end_date"), exp.end_date.as_deref(), 20);
            check.optional_text(&at("location"), exp.location.as_deref(), 100);
            check.count(&at("description"), exp.description.len(), 1, 10);
        }

        check.count("education", data.education.len(), 1, 10);
        for (i, edu) in data.education.iter().enumerate() {
            let at = |f: &str| format!("education[{i}].{f}");
            check.text(&at("institution"), &edu.institution, 1, 100);
            check.text(&at("degree"), &edu.degree, 1, 100);
            check.optional_text(&at("field"), edu.field.as_deref(), 100);
            check.optional_text(&at("graduation_date"), edu.graduation_date.as_deref(), 20);
            check.optional_text(&at("gpa"), edu.gpa.as_deref(), 10);
            check.optional_text(&at("location"), edu.location.as_deref(), 100);
        }

        if let Some(projects) = &data.projects {
            check.count("projects", projects.len(), 0, 10);
            for (i, proj) in projects.iter().enumerate() {
                let at = |f: &str| format!("projects[{i}].{f}");
                check.text(&at("name"), &proj.name, 1, 100);
                check.text(&at("description"), &proj.description, 10, 500);
                check.count(&at("technologies"), proj.technologies.len(), 1, 20);
                check.optional_text(&at("url"), proj.url.as_deref(), 200);
                check.optional_text(&at("date"), proj.date.as_deref(), 20);
            }
        }
        if let Some(certs) = &data.certifications {
            check.count("certifications", certs.len(), 0, 20);
        }
        if let Some(langs) = &data.languages {
            check.count("languages", langs.len(), 0, 10);
        }

        let job_description = self.job_description.trim().to_string();
        check.text(
            "job_description",
            &job_description,
            JOB_DESCRIPTION_MIN_CHARS,
            JOB_DESCRIPTION_MAX_CHARS,
        );

        if !check.violations.is_empty() {
            return Err(ValidationError {
                violations: check.violations,
            });
        }

        let template_style = self
            .template_style
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEMPLATE_STYLE.to_string());

        Ok(ValidatedResumeRequest {
            form_data: self.form_data,
            job_description,
            template_style,
        })
    }
}
