use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::rag::Citation;
use crate::tickets::TicketOutcome;

use super::tools::{tool_definitions, ToolExecutor};

pub const ROUND_LIMIT_REPLY: &str = "Sorry, I couldn't finish working on that request. \
Please try rephrasing your question, or ask me to create a support ticket.";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentReply {
    pub answer: String,
    /// Deduplicated, in the order they were retrieved.
    pub citations: Vec<Citation>,
    pub tickets: Vec<TicketOutcome>,
}

/// Tool-calling loop over `search_docs` and `create_ticket`.
#[derive(Clone)]
pub struct SupportAgent {
    provider: Arc<dyn LlmProvider>,
    tools: ToolExecutor,
    chat_model: String,
    max_tool_rounds: usize,
    definitions: Vec<Value>,
}

impl SupportAgent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: ToolExecutor,
        chat_model: impl Into<String>,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            provider,
            tools,
            chat_model: chat_model.into(),
            max_tool_rounds,
            definitions: tool_definitions(),
        }
    }

    /// Runs the conversation in `messages` to a final answer, appending every
    /// assistant tool-call turn and tool result along the way.
    pub async fn run(&self, messages: &mut Vec<ChatMessage>) -> Result<AgentReply, ApiError> {
        let mut reply = AgentReply::default();
        let mut rounds = 0;

        loop {
            let request = ChatRequest::new(self.chat_model.clone(), messages.clone())
                .with_tools(self.definitions.clone());
            let completion = self.provider.chat(request).await?;

            if completion.tool_calls.is_empty() {
                reply.answer = completion.content.unwrap_or_default();
                return Ok(reply);
            }

            if rounds >= self.max_tool_rounds {
                tracing::warn!(
                    "Tool round limit ({}) reached; giving up on this turn",
                    self.max_tool_rounds
                );
                reply.answer = ROUND_LIMIT_REPLY.to_string();
                return Ok(reply);
            }
            rounds += 1;

            let calls = completion.tool_calls;
            messages.push(ChatMessage::assistant_tool_calls(
                completion.content,
                calls.clone(),
            ));

            for call in &calls {
                let execution = self.tools.execute(call).await;
                for citation in execution.citations {
                    if !reply.citations.contains(&citation) {
                        reply.citations.push(citation);
                    }
                }
                if let Some(ticket) = execution.ticket {
                    reply.tickets.push(ticket);
                }
                messages.push(ChatMessage::tool_result(&call.id, &execution.output));
            }
        }
    }
}
