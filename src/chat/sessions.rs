use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, Role};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&SessionMessage> for ChatMessage {
    fn from(message: &SessionMessage) -> Self {
        ChatMessage::new(message.role, message.content.clone())
    }
}

/// Per-session chat history, kept for the lifetime of the process.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Vec<SessionMessage>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(id.clone(), Vec::new());
        tracing::debug!("Created chat session {}", id);
        id
    }

    pub async fn exists(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Appends a user message and its answer under one lock.
    pub async fn record_turn(&self, id: &str, user: &str, answer: &str) -> Result<(), ApiError> {
        let mut sessions = self.sessions.write().await;
        let history = sessions
            .get_mut(id)
            .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", id)))?;
        let now = Utc::now();
        history.push(SessionMessage {
            role: Role::User,
            content: user.to_string(),
            created_at: now,
        });
        history.push(SessionMessage {
            role: Role::Assistant,
            content: answer.to_string(),
            created_at: now,
        });
        Ok(())
    }

    pub async fn messages(&self, id: &str) -> Result<Vec<SessionMessage>, ApiError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", id)))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
