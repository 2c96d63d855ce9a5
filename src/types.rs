// Type definitions and error taxonomy

use crate::models::ContentKind;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: String, // "user", "assistant", "system"
    pub content: String,
}

impl LLMMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
}

impl LLMResponse {
    /// The provider stopped at its token limit, so the text is cut off.
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == "length"
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Missing API key: enter an API key before generating a plan")]
    MissingCredential,

    #[error("Converter unavailable: {0}")]
    ConverterUnavailable(String),

    #[error("Could not read {kind} content: {message}")]
    Decode { kind: ContentKind, message: String },

    #[error("LLM API error: {0}")]
    Provider(String),

    #[error("Report exporter is not available")]
    ExporterUnavailable,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("No migration plan has been generated for this session")]
    NoPlan,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlannerError {
    pub fn decode(kind: ContentKind, message: impl std::fmt::Display) -> Self {
        PlannerError::Decode {
            kind,
            message: message.to_string(),
        }
    }
}

pub type AppResult<T> = std::result::Result<T, PlannerError>;
