//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;

use crate::core::errors::ApiError;
use crate::llm::{ChatCompletion, ChatRequest, LlmProvider};

const KEYWORDS: [&str; 4] = ["battery", "tire", "engine", "warranty"];

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// One axis per keyword; text without any keyword maps to the zero vector.
pub fn keyword_embedding(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .map(|kw| if lower.contains(kw) { 1.0 } else { 0.0 })
        .collect()
}

/// Provider that replays queued completions and embeds by keyword.
pub struct ScriptedProvider {
    completions: Mutex<VecDeque<ChatCompletion>>,
    requests: Mutex<Vec<ChatRequest>>,
    embed_calls: Mutex<Vec<usize>>,
    chat_failure: Mutex<Option<String>>,
}

impl ScriptedProvider {
    pub fn new(completions: Vec<ChatCompletion>) -> Self {
        Self {
            completions: Mutex::new(completions.into()),
            requests: Mutex::new(Vec::new()),
            embed_calls: Mutex::new(Vec::new()),
            chat_failure: Mutex::new(None),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Every later `chat` call fails with `ApiError::Upstream(message)`.
    pub fn fail_chat_with(&self, message: &str) {
        *self.chat_failure.lock().unwrap() = Some(message.to_string());
    }

    /// Batch sizes of every `embed` call so far.
    pub fn embed_calls(&self) -> Vec<usize> {
        self.embed_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ApiError> {
        self.requests.lock().unwrap().push(request);
        if let Some(message) = self.chat_failure.lock().unwrap().clone() {
            return Err(ApiError::Upstream(message));
        }
        let next = self.completions.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| ChatCompletion {
            content: Some("done".to_string()),
            tool_calls: Vec::new(),
        }))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.lock().unwrap().push(inputs.len());
        Ok(inputs.iter().map(|text| keyword_embedding(text)).collect())
    }
}
