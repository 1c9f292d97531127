mod prompt;
mod runtime;
mod tools;

pub use prompt::system_prompt;
pub use runtime::{AgentReply, SupportAgent, ROUND_LIMIT_REPLY};
pub use tools::{tool_definitions, ToolExecution, ToolExecutor, CREATE_TICKET, SEARCH_DOCS};
