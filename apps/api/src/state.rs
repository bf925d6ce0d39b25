use crate::config::Config;
use crate::pipeline::ResumePipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Stage handles, built once at start-up.
    pub pipeline: ResumePipeline,
    pub config: Config,
}
