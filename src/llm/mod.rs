// LLM abstraction layer

pub mod provider;
pub mod openai;

pub use openai::OpenAIAdapter;
pub use provider::*;
