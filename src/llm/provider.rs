use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::session::Credential;
use crate::types::{AppResult, LLMMessage, LLMRequest, LLMResponse, PlannerError};

/// A hosted chat-completion service. The credential travels with each call
/// because it belongs to the user's session, not to the adapter.
#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, api_key: &str, request: &LLMRequest) -> AppResult<LLMResponse>;

    /// Lists model ids visible to the key. Used to validate a credential.
    async fn list_models(&self, api_key: &str) -> AppResult<Vec<String>>;
}

/// Single-turn completion against an adapter: one request, no retry, no streaming.
#[derive(Clone)]
pub struct CompletionClient {
    adapter: Arc<dyn LLMAdapter>,
    temperature: f32,
}

impl CompletionClient {
    pub fn new(adapter: Arc<dyn LLMAdapter>, temperature: f32) -> Self {
        Self { adapter, temperature }
    }

    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        credential: Option<&Credential>,
    ) -> AppResult<String> {
        let Some(credential) = credential else {
            warn!("Completion requested without an API key");
            return Err(PlannerError::MissingCredential);
        };

        let request = LLMRequest {
            model: model.to_string(),
            messages: vec![LLMMessage::system(system_prompt), LLMMessage::user(user_prompt)],
            max_tokens: None,
            temperature: Some(self.temperature),
        };

        info!(model, prompt_len = user_prompt.len(), "Requesting completion");

        let response = self
            .adapter
            .create_chat_completion(credential.expose(), &request)
            .await
            .map_err(into_provider_error)?;

        info!(
            model,
            response_len = response.content.len(),
            total_tokens = response.usage.total_tokens,
            finish_reason = %response.finish_reason,
            "Completion received"
        );
        if response.is_truncated() {
            warn!(model, "Completion hit the token limit; the plan is incomplete");
        }

        Ok(response.content)
    }

    /// Checks the key against the provider and returns how many models it can see.
    pub async fn verify(&self, credential: Option<&Credential>) -> AppResult<usize> {
        let credential = credential.ok_or(PlannerError::MissingCredential)?;
        let models = self
            .adapter
            .list_models(credential.expose())
            .await
            .map_err(into_provider_error)?;
        Ok(models.len())
    }
}

fn into_provider_error(e: PlannerError) -> PlannerError {
    match e {
        PlannerError::Provider(_) => e,
        other => PlannerError::Provider(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::types::TokenUsage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted adapter that records every request it receives.
    #[derive(Default)]
    pub struct MockAdapter {
        pub calls: AtomicUsize,
        pub fail_with: Option<String>,
        pub requests: Mutex<Vec<LLMRequest>>,
    }

    impl MockAdapter {
        pub fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LLMAdapter for MockAdapter {
        async fn create_chat_completion(&self, _api_key: &str, request: &LLMRequest) -> AppResult<LLMResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if let Some(message) = &self.fail_with {
                return Err(PlannerError::Provider(message.clone()));
            }
            Ok(LLMResponse {
                content: format!("Plan for {}", request.model),
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            })
        }

        async fn list_models(&self, _api_key: &str) -> AppResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(message) => Err(PlannerError::Provider(message.clone())),
                None => Ok(vec!["gpt-4o".to_string(), "gpt-4".to_string()]),
            }
        }
    }
}
