// OpenAI-compatible chat completions adapter
// Works against https://api.openai.com/v1 and any gateway exposing the same
// /chat/completions and /models endpoints.

use crate::config::LLMConfig;
use crate::llm::provider::LLMAdapter;
use crate::types::{AppResult, LLMMessage, LLMRequest, LLMResponse, PlannerError, TokenUsage};
use async_trait::async_trait;
use std::time::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub struct OpenAIAdapter {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [LLMMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAIAdapter {
    pub fn new(base_url: &str) -> AppResult<Self> {
        Self::with_client(Client::builder(), base_url)
    }

    pub fn from_config(config: &LLMConfig) -> AppResult<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        if config.accept_invalid_certs {
            warn!(
                base_url = %config.base_url,
                "TLS CERTIFICATE VERIFICATION IS DISABLED for the LLM provider (llm.accept_invalid_certs = true). \
                 Traffic, including the API key, can be intercepted. Only use this behind a trusted inspecting proxy."
            );
            builder = builder.danger_accept_invalid_certs(true);
        }
        Self::with_client(builder, &config.base_url)
    }

    fn with_client(builder: reqwest::ClientBuilder, base_url: &str) -> AppResult<Self> {
        let client = builder
            .build()
            .map_err(|e| PlannerError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn error_from(response: reqwest::Response) -> PlannerError {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
            return PlannerError::Provider(format!("API error ({}): {}", status, error_response.error.message));
        }
        PlannerError::Provider(format!("API error ({}): {}", status, error_text))
    }
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn create_chat_completion(&self, api_key: &str, request: &LLMRequest) -> AppResult<LLMResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, model = %request.model, "Sending chat completion");

        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlannerError::Provider(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PlannerError::Provider(format!("Failed to parse response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::Provider("Provider returned no choices".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
            usage,
        })
    }

    async fn list_models(&self, api_key: &str) -> AppResult<Vec<String>> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| PlannerError::Provider(format!("Connection failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| PlannerError::Provider(format!("Failed to parse model list: {}", e)))?;

        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}
