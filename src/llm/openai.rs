use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatCompletion, ChatRequest, ToolCall};
use crate::core::config::OpenAiConfig;
use crate::core::errors::ApiError;

/// Client for OpenAI-compatible chat completion and embedding endpoints.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ApiError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ApiError::Unavailable("Missing OPENAI_API_KEY".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "OpenAI {} error {}: {}",
                path, status, text
            )));
        }

        Ok(res)
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ApiError> {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
        });
        if !request.tools.is_empty() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("tools".to_string(), Value::Array(request.tools));
            }
        }

        let res = self.post_json("chat/completions", &body).await?;
        let payload: CompletionResponse = res.json().await.map_err(ApiError::upstream)?;

        let message = payload
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("OpenAI returned no choices".to_string()))?
            .message;

        Ok(ChatCompletion {
            content: message.content,
            tool_calls: message.tool_calls.unwrap_or_default(),
        })
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self.post_json("embeddings", &body).await?;
        let mut payload: EmbeddingResponse = res.json().await.map_err(ApiError::upstream)?;

        if payload.data.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "OpenAI returned {} embeddings for {} inputs",
                payload.data.len(),
                inputs.len()
            )));
        }

        payload.data.sort_by_key(|item| item.index);
        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}
