//! LLM module - Language Model integrations
//!
//! Provides the provider abstraction and an OpenAI-compatible client.

pub mod openai;
pub mod traits;

pub use openai::OpenAiClient;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, StreamCallback, TokenUsage};
