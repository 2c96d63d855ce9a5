use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::models::AppState;
use crate::types::{AppResult, PlannerError};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions/{id}/report", get(download_report))
        .with_state(state)
}

/// GET /api/sessions/{id}/report - The session's last successful plan as a PDF attachment
async fn download_report(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let report = state.planner.export(&state.sessions, id).await?;

    let content_type = HeaderValue::from_str(&report.content_type)
        .map_err(|e| PlannerError::Internal(format!("Invalid content type: {}", e)))?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", report.file_name))
        .map_err(|e| PlannerError::Internal(format!("Invalid file name: {}", e)))?;

    Ok((
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
        report.bytes,
    )
        .into_response())
}
