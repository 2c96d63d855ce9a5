//! Upload handling shared by preview and plan generation.

use std::path::Path as FsPath;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    routing::post,
    Json, Router,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ingest::mime_hint_for_path;
use crate::models::{AppState, ContentKind, ItemView, UploadedItem};
use crate::types::{AppResult, PlannerError};

/// Fields of the planner form. Unknown fields are ignored.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub items: Vec<UploadedItem>,
    pub kind: Option<String>,
    pub context: String,
    pub clouds: Vec<String>,
    pub model: Option<String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" | "files" => {
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let mime_hint = field
                        .content_type()
                        .map(str::to_string)
                        .unwrap_or_else(|| mime_hint_for_path(FsPath::new(&file_name)));
                    let bytes = field.bytes().await.map_err(bad_form)?;
                    debug!(file = %file_name, mime = %mime_hint, bytes = bytes.len(), "Received upload");
                    form.items.push(UploadedItem::new(file_name, mime_hint, bytes));
                }
                "kind" => form.kind = Some(field.text().await.map_err(bad_form)?),
                "context" => form.context = field.text().await.map_err(bad_form)?,
                "clouds" => form.clouds.push(field.text().await.map_err(bad_form)?),
                "model" => form.model = Some(field.text().await.map_err(bad_form)?),
                other => debug!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    pub fn kind_override(&self) -> AppResult<Option<ContentKind>> {
        ContentKind::parse_override(self.kind.as_deref())
    }
}

fn bad_form(e: MultipartError) -> PlannerError {
    PlannerError::InvalidRequest(format!("Malformed upload: {}", e))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions/{id}/preview", post(preview_files))
        .with_state(state)
}

/// POST /api/sessions/{id}/preview - Extract each upload and return what the model would see
async fn preview_files(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<Vec<ItemView>>> {
    // Previews are per-session so an unknown session is rejected early
    state.sessions.get(id).await?;

    let form = UploadForm::read(multipart).await?;
    let kind_override = form.kind_override()?;
    info!(session_id = %id, files = form.items.len(), "Preview request received");

    let outcomes = state.planner.preview(form.items, kind_override).await?;
    Ok(Json(outcomes.iter().map(|o| o.view()).collect()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::llm::provider::testing::MockAdapter;
    use crate::routes::create_router;
    use crate::routes::testing::{json_body, multipart_body, multipart_content_type, state_with, Part};

    fn preview_request(id: &str, parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/api/sessions/{}/preview", id))
            .header(header::CONTENT_TYPE, multipart_content_type())
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_preview_mixed_uploads() {
        let adapter = Arc::new(MockAdapter::default());
        let state = state_with(adapter.clone(), None);
        let id = state.sessions.create().await.to_string();
        let app = create_router(state);

        let response = app
            .oneshot(preview_request(
                &id,
                &[
                    Part::File { name: "servers.csv", content_type: "text/csv", bytes: b"host,os\nweb1,linux\n" },
                    Part::File { name: "broken.json", content_type: "application/json", bytes: b"{not json" },
                    Part::File { name: "scan.png", content_type: "image/png", bytes: b"not really a png" },
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 3);

        assert_eq!(items[0]["kind"], "csv");
        assert_eq!(items[0]["preview"]["type"], "table");
        assert_eq!(items[0]["preview"]["headers"], serde_json::json!(["host", "os"]));

        assert_eq!(items[1]["kind"], "json");
        assert!(items[1]["error"].as_str().unwrap().starts_with("Error reading broken.json"));

        assert_eq!(items[2]["kind"], "image");
        assert!(items[2]["error"].is_string());

        assert_eq!(adapter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_kind_override_applies_to_every_file() {
        let state = state_with(Arc::new(MockAdapter::default()), None);
        let id = state.sessions.create().await.to_string();
        let app = create_router(state);

        let response = app
            .oneshot(preview_request(
                &id,
                &[
                    Part::Text { name: "kind", value: "text" },
                    Part::File { name: "data.csv", content_type: "text/csv", bytes: b"a,b\n1,2\n" },
                ],
            ))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body[0]["kind"], "text");
        assert_eq!(body[0]["text"], "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_unknown_kind_is_bad_request() {
        let state = state_with(Arc::new(MockAdapter::default()), None);
        let id = state.sessions.create().await.to_string();
        let app = create_router(state);

        let response = app
            .oneshot(preview_request(&id, &[Part::Text { name: "kind", value: "docx" }]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
