// Migration Planner - turns business documents into a cloud migration plan

pub mod agents;
pub mod config;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod report;
pub mod routes;
pub mod session;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
