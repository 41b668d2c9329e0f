// ABOUTME: Hosted completion endpoint integration for the agent loop
// ABOUTME: OpenAI-compatible chat client, wire types and streaming tool call reassembly

pub mod accumulator;
pub mod service;
pub mod types;

pub use accumulator::ToolCallAccumulator;
pub use service::{
    AIService, AIServiceError, AIServiceResult, CompletionClient, CompletionStream, DEFAULT_MODEL,
    OPENAI_COMPLETIONS_URL,
};
pub use types::{
    AssistantMessage, ChatMessage, FunctionCall, FunctionDefinition, Role, StreamDelta, ToolCall,
    ToolCallDelta, ToolDefinition, Usage,
};
