// ABOUTME: Conversation bookkeeping shared by the synchronous and streaming loops
// ABOUTME: System turn insertion and tool result encoding

use crate::prompts::SYSTEM_PROMPT;
use sandcraft_ai::{ChatMessage, Role};
use serde_json::Value;

/// Insert the system prompt unless the conversation already opens with a system turn
pub fn ensure_system_turn(messages: &mut Vec<ChatMessage>) {
    let has_system = messages
        .first()
        .map(|m| m.role == Role::System)
        .unwrap_or(false);
    if !has_system {
        messages.insert(0, ChatMessage::system(SYSTEM_PROMPT));
    }
}

/// Tool-role turn carrying a JSON-encoded result
pub fn tool_turn(call_id: &str, name: &str, result: &Value) -> ChatMessage {
    ChatMessage::tool(call_id, name, result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_system_turn_is_inserted_once() {
        let mut messages = vec![ChatMessage::user("hello")];
        ensure_system_turn(&mut messages);
        ensure_system_turn(&mut messages);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content.as_deref(), Some(SYSTEM_PROMPT));
    }

    #[test]
    fn test_existing_system_turn_is_kept() {
        let mut messages = vec![ChatMessage::system("custom"), ChatMessage::user("hi")];
        ensure_system_turn(&mut messages);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content.as_deref(), Some("custom"));
    }

    #[test]
    fn test_empty_conversation_gets_system_turn() {
        let mut messages = Vec::new();
        ensure_system_turn(&mut messages);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_tool_turn_encodes_strings_as_json() {
        let turn = tool_turn("call_1", "read_sandbox_file", &json!("hi"));
        assert_eq!(turn.content.as_deref(), Some("\"hi\""));
        assert_eq!(turn.tool_call_id.as_deref(), Some("call_1"));
    }
}
