//! Document Compiler — sandboxed LaTeX → PDF compilation.
//!
//! Every invocation gets its own temporary directory, owned by a `TempDir`
//! guard and removed on every exit path. The auxiliary TeX search paths point
//! inside that directory. The child is killed if the timeout elapses.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::generation::generator::GeneratedMarkup;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw output excerpt used when no known error signature matches.
const RAW_EXCERPT_CHARS: usize = 200;
const MAX_ERROR_LINES: usize = 10;

const SOURCE_FILE: &str = "resume.tex";
const OUTPUT_FILE: &str = "resume.pdf";
const PROBE_FILE: &str = "probe.tex";

/// Minimal document exercising the class the generator asks for.
const PROBE_DOCUMENT: &str = r"\documentclass{article}
\usepackage{moderncv}
\begin{document}
Test document
\end{document}
";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A compiled PDF. Produced once, handed to the store, then dropped.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    bytes: Bytes,
}

impl CompiledDocument {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

#[derive(Debug, Error)]
pub enum CompilationError {
    #[error("LaTeX compiler could not be started: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("LaTeX workspace I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("LaTeX compilation failed: {0}")]
    Failed(String),

    #[error("LaTeX compilation finished but the PDF file was not generated")]
    OutputMissing,

    #[error("LaTeX compilation timed out after {} seconds", .timeout.as_secs())]
    TimedOut { timeout: Duration },
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The compilation stage. Carried in the pipeline as `Arc<dyn DocumentCompiler>`.
#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    async fn compile(&self, markup: &GeneratedMarkup) -> Result<CompiledDocument, CompilationError>;

    /// Compiles a fixed known-good document. Never raises; `false` means the
    /// toolchain or a required package is missing.
    async fn validate_packages(&self) -> bool;
}

// ────────────────────────────────────────────────────────────────────────────
// LatexCompiler — production implementation
// ────────────────────────────────────────────────────────────────────────────

/// Program plus leading arguments. The source file name is appended last.
#[derive(Debug, Clone)]
pub struct CompileCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl CompileCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `latexmk` in non-interactive, halt-on-first-error mode.
    pub fn latexmk() -> Self {
        Self::new(
            "latexmk",
            [
                "-pdf",
                "-interaction=nonstopmode",
                "-halt-on-error",
                "-file-line-error",
            ],
        )
    }

    pub fn pdflatex_probe() -> Self {
        Self::new("pdflatex", ["-interaction=nonstopmode"])
    }
}

pub struct LatexCompiler {
    timeout: Duration,
    command: CompileCommand,
    probe_command: CompileCommand,
    probe_timeout: Duration,
}

impl LatexCompiler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            command: CompileCommand::latexmk(),
            probe_command: CompileCommand::pdflatex_probe(),
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_command(mut self, command: CompileCommand) -> Self {
        self.command = command;
        self
    }

    pub fn with_probe_command(mut self, command: CompileCommand) -> Self {
        self.probe_command = command;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn compile_in_sandbox(
        &self,
        markup: &GeneratedMarkup,
    ) -> Result<CompiledDocument, CompilationError> {
        let workdir = tempfile::Builder::new().prefix("resume_").tempdir()?;

        tokio::fs::write(workdir.path().join(SOURCE_FILE), markup.as_str()).await?;

        let output = run_sandboxed(&self.command, workdir.path(), SOURCE_FILE, self.timeout)
            .await?
            .ok_or(CompilationError::TimedOut {
                timeout: self.timeout,
            })?;

        if !output.status.success() {
            let combined = format!(
                "{}\n{}",
                String::from_utf8_lossy(&output.stderr),
                String::from_utf8_lossy(&output.stdout)
            );
            return Err(CompilationError::Failed(parse_latex_error(&combined)));
        }

        let pdf_path = workdir.path().join(OUTPUT_FILE);
        if !tokio::fs::try_exists(&pdf_path).await? {
            return Err(CompilationError::OutputMissing);
        }

        let bytes = tokio::fs::read(&pdf_path).await?;
        Ok(CompiledDocument::new(bytes))
    }

    async fn run_probe(&self) -> Result<Option<std::process::Output>, CompilationError> {
        let workdir = tempfile::Builder::new().prefix("resume_probe_").tempdir()?;
        tokio::fs::write(workdir.path().join(PROBE_FILE), PROBE_DOCUMENT).await?;
        run_sandboxed(
            &self.probe_command,
            workdir.path(),
            PROBE_FILE,
            self.probe_timeout,
        )
        .await
    }
}

#[async_trait]
impl DocumentCompiler for LatexCompiler {
    async fn compile(&self, markup: &GeneratedMarkup) -> Result<CompiledDocument, CompilationError> {
        match self.compile_in_sandbox(markup).await {
            Ok(document) => {
                info!("Successfully compiled PDF ({} bytes)", document.len());
                Ok(document)
            }
            Err(e) => {
                error!("LaTeX compilation failed: {e}");
                Err(e)
            }
        }
    }

    async fn validate_packages(&self) -> bool {
        match self.run_probe().await {
            Ok(Some(output)) if output.status.success() => true,
            Ok(Some(output)) => {
                warn!(
                    "LaTeX package validation failed with status {}",
                    output.status
                );
                false
            }
            Ok(None) => {
                warn!(
                    "LaTeX package validation timed out after {}s",
                    self.probe_timeout.as_secs()
                );
                false
            }
            Err(e) => {
                warn!("LaTeX validation failed: {e}");
                false
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sandbox helpers
// ────────────────────────────────────────────────────────────────────────────

/// TeX auxiliary search/write paths, all confined to `workdir`.
pub fn sandbox_env(workdir: &Path) -> [(&'static str, PathBuf); 3] {
    [
        ("TEXMFHOME", workdir.join(".texmf")),
        ("TEXMFVAR", workdir.join(".texmf-var")),
        ("TEXMFCONFIG", workdir.join(".texmf-config")),
    ]
}

/// Runs `command source_file` inside `workdir`.
///
/// Returns `Ok(None)` when `timeout` elapses; the child is killed when its
/// future is dropped.
async fn run_sandboxed(
    command: &CompileCommand,
    workdir: &Path,
    source_file: &str,
    timeout: Duration,
) -> Result<Option<std::process::Output>, CompilationError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .arg(source_file)
        .current_dir(workdir)
        .envs(sandbox_env(workdir))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => result.map(Some).map_err(CompilationError::Spawn),
        Err(_elapsed) => Ok(None),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Error parsing
// ────────────────────────────────────────────────────────────────────────────

/// Turns raw compiler output into a short, human-readable message.
///
/// Known signatures come first, then the distinct `!` / `Error` lines. With no
/// match, falls back to a truncated excerpt of the raw output.
pub fn parse_latex_error(output: &str) -> String {
    let mut messages: Vec<String> = Vec::new();

    if output.contains("Undefined control sequence") {
        messages.push("Undefined LaTeX command found".to_string());
    }
    if output.contains("Missing") && output.contains("inserted") {
        messages.push("Missing LaTeX syntax element".to_string());
    }
    if output.contains("Package") && output.contains("Error") {
        messages.push("LaTeX package error".to_string());
    }
    if output.contains("Emergency stop") {
        messages.push("Critical LaTeX error - compilation stopped".to_string());
    }

    let mut detail_lines = 0;
    for line in output.lines().map(str::trim) {
        if detail_lines == MAX_ERROR_LINES {
            break;
        }
        if (line.starts_with('!') || line.contains("Error"))
            && !messages.iter().any(|m| m == line)
        {
            messages.push(line.to_string());
            detail_lines += 1;
        }
    }

    if !messages.is_empty() {
        return messages.join("; ");
    }

    let raw = output.trim();
    if raw.is_empty() {
        return "Unknown LaTeX error".to_string();
    }
    if raw.chars().count() > RAW_EXCERPT_CHARS {
        let excerpt: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
        format!("{excerpt}...")
    } else {
        raw.to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
