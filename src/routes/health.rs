use axum::{extract::State, routing::get, Json, Router};

use crate::models::{AppState, ContentKind, HealthResponse, OptionsResponse, TargetCloud};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/options", get(options))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let capabilities = state.planner.capabilities();

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        ocr: capabilities.ocr,
        pdf_text: capabilities.pdf_text,
        export: capabilities.export,
    })
}

async fn options(State(state): State<AppState>) -> Json<OptionsResponse> {
    let input_types = std::iter::once("auto")
        .chain(ContentKind::ALL.iter().map(|k| k.as_str()))
        .map(str::to_string)
        .collect();

    Json(OptionsResponse {
        models: state.planner.allowed_models().to_vec(),
        default_model: state.planner.default_model().to_string(),
        clouds: TargetCloud::ALL.to_vec(),
        default_clouds: vec![TargetCloud::Azure],
        input_types,
    })
}
