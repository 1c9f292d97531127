//! Conversation front-end shared by the web UI and the CLI.

mod sessions;

use serde::Serialize;

pub use sessions::{SessionMessage, SessionStore};

use crate::agent::SupportAgent;
use crate::core::errors::ApiError;
use crate::llm::ChatMessage;
use crate::rag::{format_citations, Citation};
use crate::tickets::TicketOutcome;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub session_id: String,
    pub answer: String,
    /// Rendered `Sources: ...` line, empty when nothing was cited.
    pub sources: String,
    pub citations: Vec<Citation>,
    pub tickets: Vec<TicketOutcome>,
}

#[derive(Clone)]
pub struct ChatService {
    agent: SupportAgent,
    sessions: SessionStore,
    system_prompt: String,
}

impl ChatService {
    pub fn new(agent: SupportAgent, sessions: SessionStore, system_prompt: String) -> Self {
        Self {
            agent,
            sessions,
            system_prompt,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn send(&self, session_id: Option<&str>, text: &str) -> Result<ChatTurn, ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::BadRequest("Message must not be empty".to_string()));
        }

        let session_id = match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                if !self.sessions.exists(id).await {
                    return Err(ApiError::NotFound(format!("Session not found: {}", id)));
                }
                id.to_string()
            }
            None => self.sessions.create().await,
        };

        let history = self.sessions.messages(&session_id).await?;
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(text));

        // Only completed turns enter the history.
        let reply = self.agent.run(&mut messages).await?;
        self.sessions
            .record_turn(&session_id, text, &reply.answer)
            .await?;

        Ok(ChatTurn {
            session_id,
            sources: format_citations(&reply.citations),
            answer: reply.answer,
            citations: reply.citations,
            tickets: reply.tickets,
        })
    }
}
