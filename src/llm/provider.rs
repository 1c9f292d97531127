use async_trait::async_trait;

use super::types::{ChatCompletion, ChatRequest};
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion with optional tool definitions
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ApiError>;

    /// generate one embedding per input, in input order
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
