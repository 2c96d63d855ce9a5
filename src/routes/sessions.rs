//! Session API Routes
//!
//! - POST /api/sessions - Start a session (seeded with the configured API key, if any)
//! - DELETE /api/sessions/{id} - Drop a session and everything it holds
//! - PUT /api/sessions/{id}/credential - Set the session's API key
//! - DELETE /api/sessions/{id}/credential - Forget the session's API key
//! - POST /api/sessions/{id}/credential/verify - Check the key against the provider

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::models::{AppState, SessionResponse};
use crate::session::Credential;
use crate::types::{AppResult, PlannerError};

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", delete(delete_session))
        .route("/api/sessions/{id}/credential", put(set_credential).delete(clear_credential))
        .route("/api/sessions/{id}/credential/verify", post(verify_credential))
        .with_state(state)
}

async fn create_session(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let id = state.sessions.create().await;
    let has_credential = state.sessions.credential(id).await?.is_some();
    info!(session_id = %id, has_credential, "Session created");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: id,
            has_credential,
        }),
    ))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    if state.sessions.remove(id).await {
        info!(session_id = %id, "Session removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(PlannerError::SessionNotFound(id.to_string()))
    }
}

async fn set_credential(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CredentialRequest>,
) -> AppResult<Json<SessionResponse>> {
    let credential = Credential::new(request.api_key);
    let has_credential = credential.is_some();
    state.sessions.set_credential(id, credential).await?;
    info!(session_id = %id, has_credential, "API key updated");

    Ok(Json(SessionResponse {
        session_id: id,
        has_credential,
    }))
}

async fn clear_credential(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<SessionResponse>> {
    state.sessions.clear_credential(id).await?;
    info!(session_id = %id, "API key cleared");

    Ok(Json(SessionResponse {
        session_id: id,
        has_credential: false,
    }))
}

async fn verify_credential(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<impl IntoResponse> {
    let models = state.planner.verify_credential(&state.sessions, id).await?;

    Ok(Json(json!({
        "valid": true,
        "models": models
    })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::llm::provider::testing::MockAdapter;
    use crate::routes::create_router;
    use crate::routes::testing::{json_body, state_with};
    use crate::session::Credential;

    fn put_key(id: &str, key: &str) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri(format!("/api/sessions/{}/credential", id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "api_key": key }).to_string()))
            .unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder().method(Method::POST).uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_create_session_reports_seeded_key() {
        let app = create_router(state_with(Arc::new(MockAdapter::default()), Credential::new("sk-env")));
        let response = app.oneshot(post("/api/sessions")).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["has_credential"], true);
        assert!(body["session_id"].is_string());
    }

    #[tokio::test]
    async fn test_set_and_verify_key() {
        let adapter = Arc::new(MockAdapter::default());
        let state = state_with(adapter.clone(), None);
        let id = state.sessions.create().await.to_string();
        let app = create_router(state);

        let response = app.clone().oneshot(put_key(&id, "sk-user")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["has_credential"], true);

        let response = app
            .oneshot(post(&format!("/api/sessions/{}/credential/verify", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["models"], 2);
    }

    #[tokio::test]
    async fn test_verify_without_key_is_unauthorized() {
        let state = state_with(Arc::new(MockAdapter::default()), None);
        let id = state.sessions.create().await;
        let app = create_router(state);

        let response = app
            .oneshot(post(&format!("/api/sessions/{}/credential/verify", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Missing API key");
    }

    #[tokio::test]
    async fn test_blank_key_clears_credential() {
        let state = state_with(Arc::new(MockAdapter::default()), Credential::new("sk-env"));
        let id = state.sessions.create().await;
        let sessions = state.sessions.clone();
        let app = create_router(state);

        let response = app.oneshot(put_key(&id.to_string(), "   ")).await.unwrap();
        assert_eq!(json_body(response).await["has_credential"], false);
        assert!(sessions.credential(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = create_router(state_with(Arc::new(MockAdapter::default()), None));
        let response = app
            .oneshot(put_key(&uuid::Uuid::new_v4().to_string(), "sk-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
