// ABOUTME: Incremental reassembly of tool calls split across streaming delta events
// ABOUTME: Fragments are addressed by index and concatenated in arrival order; finalize yields whole calls

use crate::types::{ToolCall, ToolCallDelta};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Collects `ToolCallDelta` fragments for one completion.
///
/// Works the same whether it is fed from a live stream or a fixture.
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    partials: BTreeMap<usize, PartialToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &ToolCallDelta) {
        let partial = self.partials.entry(delta.index).or_default();

        if let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) {
            partial.id = Some(id.to_string());
        }
        if let Some(function) = &delta.function {
            if let Some(name) = &function.name {
                partial.name.push_str(name);
            }
            if let Some(arguments) = &function.arguments {
                partial.arguments.push_str(arguments);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    /// Completed tool calls in index order. Calls without an id get `call_<index>`.
    pub fn finalize(self) -> Vec<ToolCall> {
        self.partials
            .into_iter()
            .map(|(index, partial)| {
                let id = partial.id.unwrap_or_else(|| format!("call_{}", index));
                ToolCall::new(id, partial.name, partial.arguments)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fragments_concatenate_into_one_call() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(&ToolCallDelta::new(0, Some("create_"), Some("{\"na")));
        acc.push(&ToolCallDelta::new(0, Some("repo"), Some("me\":\"x\"}")));

        let calls = acc.finalize();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "create_repo");
        assert_eq!(calls[0].function.arguments, "{\"name\":\"x\"}");
    }

    #[test]
    fn test_interleaved_indices_stay_separate_and_ordered() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(&ToolCallDelta::new(1, Some("list_repos"), Some("")).with_id("call_b"));
        acc.push(&ToolCallDelta::new(0, Some("run_terminal_command"), Some("{\"comm")).with_id("call_a"));
        acc.push(&ToolCallDelta::new(1, None, Some("{}")));
        acc.push(&ToolCallDelta::new(0, None, Some("and\":\"ls\"}")));

        let calls = acc.finalize();
        assert_eq!(
            calls,
            vec![
                ToolCall::new("call_a", "run_terminal_command", "{\"command\":\"ls\"}"),
                ToolCall::new("call_b", "list_repos", "{}"),
            ]
        );
    }

    #[test]
    fn test_missing_id_is_synthesized() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(&ToolCallDelta::new(2, Some("list_repos"), None));

        assert_eq!(acc.len(), 1);
        assert_eq!(acc.finalize()[0].id, "call_2");
    }

    #[test]
    fn test_empty_accumulator() {
        let acc = ToolCallAccumulator::new();
        assert!(acc.is_empty());
        assert!(acc.finalize().is_empty());
    }
}
