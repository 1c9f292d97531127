use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::ToolCall;
use crate::rag::{Citation, Retriever};
use crate::tickets::{outcome_to_value, GitHubTickets, TicketOutcome, TicketRequest};

pub const SEARCH_DOCS: &str = "search_docs";
pub const CREATE_TICKET: &str = "create_ticket";

/// Function-tool schemas advertised to the model.
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "type": "function",
            "function": {
                "name": SEARCH_DOCS,
                "description": "Search in the internal PDF knowledge base and return relevant chunks with sources and pages.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "question": { "type": "string", "description": "User question to search for." }
                    },
                    "required": ["question"],
                    "additionalProperties": false
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": CREATE_TICKET,
                "description": "Create a support ticket when the answer is not found or user asks to create a ticket.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "email": { "type": "string" },
                        "title": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name", "email", "title", "description"],
                    "additionalProperties": false
                }
            }
        }),
    ]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchDocsArgs {
    question: String,
}

#[derive(Debug, Clone)]
pub struct ToolExecution {
    /// JSON returned to the model as the tool message content.
    pub output: Value,
    pub citations: Vec<Citation>,
    pub ticket: Option<TicketOutcome>,
}

impl ToolExecution {
    fn output(output: Value) -> Self {
        Self {
            output,
            citations: Vec::new(),
            ticket: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self::output(json!({ "ok": false, "error": message.into() }))
    }
}

#[derive(Clone)]
pub struct ToolExecutor {
    retriever: Retriever,
    tickets: GitHubTickets,
}

impl ToolExecutor {
    pub fn new(retriever: Retriever, tickets: GitHubTickets) -> Self {
        Self { retriever, tickets }
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolExecution {
        let name = call.function.name.as_str();
        tracing::info!("Executing tool {} ({})", name, call.id);

        match name {
            SEARCH_DOCS => match parse_args::<SearchDocsArgs>(name, &call.function.arguments) {
                Ok(args) => self.search_docs(&args.question).await,
                Err(execution) => execution,
            },
            CREATE_TICKET => match parse_args::<TicketRequest>(name, &call.function.arguments) {
                Ok(request) => {
                    let outcome = self.tickets.create_ticket(&request).await;
                    ToolExecution {
                        output: outcome_to_value(&outcome),
                        citations: Vec::new(),
                        ticket: Some(outcome),
                    }
                }
                Err(execution) => execution,
            },
            other => ToolExecution::error(format!("Unknown tool: {}", other)),
        }
    }

    async fn search_docs(&self, question: &str) -> ToolExecution {
        match self.retriever.search_docs(question).await {
            Ok(result) => {
                let citations = if result.found {
                    result.citations.clone()
                } else {
                    Vec::new()
                };
                let output = serde_json::to_value(&result)
                    .unwrap_or_else(|e| json!({ "ok": false, "error": e.to_string() }));
                ToolExecution {
                    output,
                    citations,
                    ticket: None,
                }
            }
            Err(err) => {
                tracing::warn!("search_docs failed: {}", err);
                ToolExecution::error(format!("search_docs failed: {}", err))
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, raw: &str) -> Result<T, ToolExecution> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str::<T>(raw).map_err(|e| {
        tracing::warn!("Invalid arguments for {}: {}", tool, e);
        ToolExecution::error(format!("Invalid arguments for {}: {}", tool, e))
    })
}
