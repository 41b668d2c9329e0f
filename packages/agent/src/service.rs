// ABOUTME: Agentic conversation loop driving completions and tool dispatch
// ABOUTME: Synchronous mode returns the final answer; streaming mode yields AgentEvents

use crate::conversation::{ensure_system_turn, tool_turn};
use crate::error::{AgentError, AgentResult};
use crate::events::AgentEvent;
use crate::executor::ToolExecutor;
use crate::tools::parse_arguments;
use futures::stream::Stream;
use futures::StreamExt;
use sandcraft_ai::{ChatMessage, CompletionClient, StreamDelta, ToolCall, ToolCallAccumulator};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

pub type AgentEventStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;

#[derive(Clone)]
pub struct AgentService {
    client: Arc<dyn CompletionClient>,
    executor: Arc<ToolExecutor>,
    max_tool_rounds: usize,
}

impl AgentService {
    pub fn new(client: Arc<dyn CompletionClient>, executor: Arc<ToolExecutor>) -> Self {
        Self {
            client,
            executor,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    /// Run one turn to completion and return the assistant's final text.
    ///
    /// Tools are offered for at most `max_tool_rounds` rounds; the call after
    /// the last round omits them so the model has to answer in text.
    pub async fn chat(&self, owner: &str, mut messages: Vec<ChatMessage>) -> AgentResult<String> {
        ensure_system_turn(&mut messages);
        let definitions = self.executor.definitions();

        for round in 0..=self.max_tool_rounds {
            let tools = (round < self.max_tool_rounds).then_some(definitions);
            let reply = self.client.complete(&messages, tools).await?;

            if !reply.has_tool_calls() {
                info!("Turn for {} finished after {} tool rounds", owner, round);
                return Ok(reply.content.unwrap_or_default());
            }
            if tools.is_none() {
                break;
            }

            debug!(
                "Round {} for {}: {} tool calls",
                round + 1,
                owner,
                reply.tool_calls.len()
            );
            messages.push(ChatMessage::assistant_with_tools(
                reply.content,
                reply.tool_calls.clone(),
            ));
            for call in reply.tool_calls {
                let result = run_tool(&self.executor, owner, &call).await?;
                messages.push(tool_turn(&call.id, &call.function.name, &result));
            }
        }

        Err(AgentError::MaxRoundsExceeded(self.max_tool_rounds))
    }

    /// Run one turn, yielding content as it arrives and an event pair per tool call.
    ///
    /// Dropping the stream stops the turn. A tool call that has already been
    /// dispatched still runs to completion.
    pub fn chat_stream(&self, owner: &str, mut messages: Vec<ChatMessage>) -> AgentEventStream {
        ensure_system_turn(&mut messages);
        let client = self.client.clone();
        let executor = self.executor.clone();
        let max_rounds = self.max_tool_rounds;
        let owner = owner.to_string();

        let stream = async_stream::stream! {
            let mut round = 0;
            loop {
                let tools = (round < max_rounds).then(|| executor.definitions());
                let mut completion = match client.complete_stream(&messages, tools).await {
                    Ok(completion) => completion,
                    Err(e) => {
                        warn!("Completion stream for {} failed to open: {}", owner, e);
                        yield AgentEvent::error(AgentError::from(e));
                        return;
                    }
                };

                let mut content = String::new();
                let mut accumulator = ToolCallAccumulator::new();
                while let Some(delta) = completion.next().await {
                    match delta {
                        Ok(StreamDelta::Content(text)) => {
                            content.push_str(&text);
                            yield AgentEvent::content(text);
                        }
                        Ok(StreamDelta::ToolCall(fragment)) => accumulator.push(&fragment),
                        Err(e) => {
                            warn!("Completion stream for {} failed: {}", owner, e);
                            yield AgentEvent::error(AgentError::from(e));
                            return;
                        }
                    }
                }

                if accumulator.is_empty() {
                    info!("Streaming turn for {} finished after {} tool rounds", owner, round);
                    return;
                }
                if tools.is_none() {
                    yield AgentEvent::error(AgentError::MaxRoundsExceeded(max_rounds));
                    return;
                }

                let calls = accumulator.finalize();
                debug!("Round {} for {}: {} tool calls", round + 1, owner, calls.len());
                let content = (!content.is_empty()).then_some(content);
                messages.push(ChatMessage::assistant_with_tools(content, calls.clone()));

                for call in calls {
                    yield AgentEvent::ToolStart {
                        name: call.function.name.clone(),
                        args: display_arguments(&call.function.arguments),
                    };
                    let result = match run_tool(&executor, &owner, &call).await {
                        Ok(result) => result,
                        Err(e) => {
                            yield AgentEvent::error(e);
                            return;
                        }
                    };
                    messages.push(tool_turn(&call.id, &call.function.name, &result));
                    yield AgentEvent::ToolResult {
                        name: call.function.name.clone(),
                        result,
                    };
                }
                round += 1;
            }
        };

        Box::pin(stream)
    }
}

// Runs on its own task so an abandoned turn cannot cancel a tool call midway
async fn run_tool(executor: &Arc<ToolExecutor>, owner: &str, call: &ToolCall) -> AgentResult<Value> {
    let executor = executor.clone();
    let owner = owner.to_string();
    let name = call.function.name.clone();
    let arguments = call.function.arguments.clone();

    tokio::spawn(async move { executor.execute(&owner, &name, &arguments).await })
        .await
        .map_err(|e| AgentError::ToolTask(e.to_string()))
}

/// Parsed arguments for display; unparseable text is passed through as a string
fn display_arguments(arguments: &str) -> Value {
    parse_arguments(arguments).unwrap_or_else(|_| Value::String(arguments.to_string()))
}
