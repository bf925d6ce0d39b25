pub mod health;
pub mod maintenance;
pub mod resumes;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/resumes", post(resumes::handle_generate_resume))
        .route(
            "/api/v1/maintenance/cleanup",
            post(maintenance::handle_cleanup),
        )
        .route("/api/v1/storage", get(maintenance::handle_storage_info))
        .with_state(state)
}
