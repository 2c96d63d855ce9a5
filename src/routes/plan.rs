use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use super::error_parts;
use super::files::UploadForm;
use crate::agents::PlanInput;
use crate::models::{AppState, ItemView, PlanResponse, TargetCloud};
use crate::types::AppResult;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions/{id}/plan", post(generate_plan))
        .with_state(state)
}

/// POST /api/sessions/{id}/plan - Run the whole pipeline for one form submission
///
/// Item-level extraction errors are reported in `items` alongside the plan.
/// A failed completion is returned with its error status and still carries `items`.
async fn generate_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Response> {
    // Reject unknown sessions before buffering the upload
    state.sessions.get(id).await?;

    let form = UploadForm::read(multipart).await?;
    let kind_override = form.kind_override()?;
    let clouds = TargetCloud::parse_set(form.clouds.iter().map(String::as_str))?;

    info!(session_id = %id, files = form.items.len(), "Plan request received");

    let generation = state
        .planner
        .generate(
            &state.sessions,
            id,
            PlanInput {
                items: form.items,
                kind_override,
                context: form.context,
                clouds,
                model: form.model,
            },
        )
        .await?;

    let items: Vec<ItemView> = generation.items.iter().map(|o| o.view()).collect();

    match generation.result {
        Ok(plan) => Ok(Json(PlanResponse { items, plan }).into_response()),
        Err(e) => {
            let (status, mut body) = error_parts(&e);
            body["items"] = serde_json::to_value(&items).unwrap_or_default();
            Ok((status, Json(body)).into_response())
        }
    }
}
