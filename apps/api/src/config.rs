use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Start-up fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub latex_timeout_secs: u64,
    pub s3_bucket: String,
    pub aws_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    /// Custom S3 endpoint (MinIO locally). `None` means AWS proper.
    pub s3_endpoint: Option<String>,
    pub max_resume_size_mb: u64,
    pub cleanup_days_old: u32,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let aws_access_key_id = optional_env("AWS_ACCESS_KEY_ID");
        let aws_secret_access_key = optional_env("AWS_SECRET_ACCESS_KEY");
        if aws_access_key_id.is_some() != aws_secret_access_key.is_some() {
            bail!("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together");
        }

        let debug = optional_env("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let default_level = if debug { "debug" } else { "info" };

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_model: optional_env("OPENAI_MODEL").unwrap_or_else(|| "gpt-4.1".to_string()),
            openai_base_url: optional_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            latex_timeout_secs: parse_env("LATEX_TIMEOUT", 10)?,
            s3_bucket: require_env("S3_BUCKET_NAME")?,
            aws_region: optional_env("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id,
            aws_secret_access_key,
            s3_endpoint: optional_env("S3_ENDPOINT"),
            max_resume_size_mb: parse_env("MAX_RESUME_SIZE_MB", 5)?,
            cleanup_days_old: parse_env("CLEANUP_DAYS_OLD", 30)?,
            host: optional_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_env("SERVER_PORT", 8000)?,
            debug,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| default_level.to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            openai_api_key: "sk-test".to_string(),
            openai_model: "gpt-4.1".to_string(),
            openai_base_url: "http://127.0.0.1:9".to_string(),
            latex_timeout_secs: 10,
            s3_bucket: "resumes-test".to_string(),
            aws_region: "us-east-1".to_string(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            s3_endpoint: None,
            max_resume_size_mb: 5,
            cleanup_days_old: 30,
            host: "127.0.0.1".to_string(),
            port: 8000,
            debug: false,
            rust_log: "info".to_string(),
        }
    }
}
