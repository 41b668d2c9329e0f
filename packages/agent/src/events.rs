// ABOUTME: Events produced by the streaming conversation loop
// ABOUTME: Serialized one per line as newline-delimited JSON toward the frontend

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Text forwarded as soon as the model produces it
    Content { content: String },
    ToolStart { name: String, args: Value },
    ToolResult { name: String, result: Value },
    /// Terminal; nothing follows it
    Error { message: String },
}

impl AgentEvent {
    pub fn content(content: impl Into<String>) -> Self {
        AgentEvent::Content {
            content: content.into(),
        }
    }

    pub fn error(message: impl ToString) -> Self {
        AgentEvent::Error {
            message: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentEvent::Error { .. })
    }

    /// One NDJSON line, terminated by `\n`
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_event_wire_shapes() {
        assert_eq!(
            serde_json::to_value(AgentEvent::content("hi")).unwrap(),
            json!({"type": "content", "content": "hi"})
        );
        assert_eq!(
            serde_json::to_value(AgentEvent::ToolStart {
                name: "list_repos".to_string(),
                args: json!({}),
            })
            .unwrap(),
            json!({"type": "tool_start", "name": "list_repos", "args": {}})
        );
        assert_eq!(
            serde_json::to_value(AgentEvent::ToolResult {
                name: "list_repos".to_string(),
                result: json!([]),
            })
            .unwrap(),
            json!({"type": "tool_result", "name": "list_repos", "result": []})
        );
    }

    #[test]
    fn test_ndjson_is_single_line() {
        let line = AgentEvent::content("a\nb").to_ndjson().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }
}
