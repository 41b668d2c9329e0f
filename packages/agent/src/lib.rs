// ABOUTME: Agent layer turning natural-language requests into sandbox and GitHub operations
// ABOUTME: Typed tool dispatch plus synchronous and streaming tool-calling conversation loops

pub mod conversation;
pub mod error;
pub mod events;
pub mod executor;
pub mod handlers;
pub mod prompts;
pub mod service;
pub mod tools;

pub use error::{AgentError, AgentResult, ToolError};
pub use events::AgentEvent;
pub use executor::ToolExecutor;
pub use prompts::SYSTEM_PROMPT;
pub use service::{AgentEventStream, AgentService, DEFAULT_MAX_TOOL_ROUNDS};
pub use tools::{tool_definitions, ToolInvocation, ToolName, DEFAULT_COMMIT_MESSAGE};
