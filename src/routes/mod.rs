//! API Routes
//!
//! This module organizes all HTTP endpoints for the planner:
//! - `/api/health` - Health and capability checks
//! - `/api/options` - Models, target clouds and input types offered by the form
//! - `/api/sessions` - Session lifecycle and API key management
//! - `/api/sessions/{id}/preview` - Extract uploads without calling the model
//! - `/api/sessions/{id}/plan` - Generate a migration plan
//! - `/api/sessions/{id}/report` - Download the last plan as PDF

pub mod files;
pub mod health;
pub mod plan;
pub mod report;
pub mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::models::AppState;
use crate::types::PlannerError;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let server = state.config.server.clone();

    Router::new()
        .merge(health::router(state.clone()))
        .merge(sessions::router(state.clone()))
        .merge(files::router(state.clone()))
        .merge(plan::router(state.clone()))
        .merge(report::router(state))
        .layer(DefaultBodyLimit::max(server.max_upload_mb.saturating_mul(1024 * 1024)))
        .layer(cors_layer(&server))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origin = if server.cors_allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = server
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Status code and `{ "error", "details" }` body for a planner failure.
pub(crate) fn error_parts(err: &PlannerError) -> (StatusCode, Value) {
    let (status, summary) = match err {
        PlannerError::MissingCredential => (StatusCode::UNAUTHORIZED, "Missing API key"),
        PlannerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
        PlannerError::Decode { .. } => (StatusCode::BAD_REQUEST, "Could not read upload"),
        PlannerError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "Session not found"),
        PlannerError::NoPlan => (StatusCode::CONFLICT, "No plan to export"),
        PlannerError::Provider(_) => (StatusCode::BAD_GATEWAY, "LLM provider error"),
        PlannerError::ConverterUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "Converter unavailable"),
        PlannerError::ExporterUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "Export unavailable"),
        PlannerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    };

    (
        status,
        json!({
            "error": summary,
            "details": err.to_string()
        }),
    )
}

impl IntoResponse for PlannerError {
    fn into_response(self) -> Response {
        let (status, body) = error_parts(&self);
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        } else {
            warn!(status = %status, error = %self, "Request rejected");
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Response;
    use serde_json::Value;

    use crate::agents::MigrationPlanner;
    use crate::config::Config;
    use crate::ingest::{ContentExtractor, Converters};
    use crate::llm::provider::testing::MockAdapter;
    use crate::llm::CompletionClient;
    use crate::models::AppState;
    use crate::report::ReportExporter;
    use crate::session::{Credential, SessionStore};

    pub const BOUNDARY: &str = "planner-test-boundary";

    pub fn state_with(adapter: Arc<MockAdapter>, credential: Option<Credential>) -> AppState {
        let config = Config::default();
        let planner = MigrationPlanner::new(
            ContentExtractor::new(Converters::none(), config.ingest.preview_rows),
            CompletionClient::new(adapter, config.llm.temperature),
            ReportExporter::pdf(),
            config.llm.clone(),
            config.export.title.clone(),
        );
        AppState {
            config,
            planner: Arc::new(planner),
            sessions: SessionStore::new(credential),
        }
    }

    pub enum Part<'a> {
        File { name: &'a str, content_type: &'a str, bytes: &'a [u8] },
        Text { name: &'a str, value: &'a str },
    }

    pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::File { name, content_type, bytes } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            name, content_type
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
                Part::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value).as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    pub fn multipart_content_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    pub async fn json_body(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
