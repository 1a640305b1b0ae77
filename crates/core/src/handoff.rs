//! Resolution of the target agent of a hand-off event.
//!
//! Hand-off payloads have changed shape across backend SDK versions, so the
//! target is recovered by trying a fixed list of extraction strategies in
//! order. Each strategy is a pure function over the raw JSON payload and
//! the first one returning a name wins. This is a compatibility shim for
//! the backend's event shapes, not a contract of its own.

use crate::agent::TRANSFER_TOOL_PREFIX;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static TRANSFER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"transfer_to_([A-Za-z0-9_]+)").expect("static pattern"));

/// Which strategy produced a resolved name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMethod {
    /// Name of the last entry in `context.history`.
    History,
    /// Top-level `agent_name` field.
    AgentNameField,
    /// Top-level `tool_name` field.
    ToolNameField,
    /// Free-text search of the serialized `context`.
    ContextSearch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub agent_name: String,
    pub method: ResolutionMethod,
}

type Strategy = fn(&Value) -> Option<String>;

/// Strategies in precedence order.
pub const STRATEGIES: [(ResolutionMethod, Strategy); 4] = [
    (ResolutionMethod::History, from_history),
    (ResolutionMethod::AgentNameField, from_agent_name_field),
    (ResolutionMethod::ToolNameField, from_tool_name_field),
    (ResolutionMethod::ContextSearch, from_context_search),
];

/// Extracts `<name>` from a `transfer_to_<name>` tool name.
///
/// Only the segment between the first and a possible second occurrence of
/// the prefix is kept. An empty segment is not a name.
fn target_from_tool_name(tool_name: &str) -> Option<String> {
    tool_name
        .split(TRANSFER_TOOL_PREFIX)
        .nth(1)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

pub fn from_history(event: &Value) -> Option<String> {
    let last = event.pointer("/context/history")?.as_array()?.last()?;
    let name = last.get("name")?.as_str()?;
    target_from_tool_name(name)
}

pub fn from_agent_name_field(event: &Value) -> Option<String> {
    event
        .get("agent_name")?
        .as_str()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

pub fn from_tool_name_field(event: &Value) -> Option<String> {
    target_from_tool_name(event.get("tool_name")?.as_str()?)
}

pub fn from_context_search(event: &Value) -> Option<String> {
    let context = event.get("context")?;
    let serialized = serde_json::to_string(context).ok()?;
    TRANSFER_PATTERN
        .captures(&serialized)
        .map(|caps| caps[1].to_string())
}

/// Runs the strategies in order and returns the first name found.
pub fn resolve(event: &Value) -> Option<Resolution> {
    STRATEGIES.iter().find_map(|(method, strategy)| {
        strategy(event).map(|agent_name| Resolution {
            agent_name,
            method: *method,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_strategy() {
        let event = json!({
            "context": { "history": [
                { "type": "message", "role": "user" },
                { "type": "function_call", "name": "transfer_to_events" }
            ]}
        });
        let resolution = resolve(&event).unwrap();
        assert_eq!(resolution.agent_name, "events");
        assert_eq!(resolution.method, ResolutionMethod::History);
    }

    #[test]
    fn test_history_wins_over_disagreeing_fields() {
        let event = json!({
            "agent_name": "courses",
            "tool_name": "transfer_to_cultural",
            "context": { "history": [{ "name": "transfer_to_events" }] }
        });
        assert_eq!(resolve(&event).unwrap().agent_name, "events");
    }

    #[test]
    fn test_agent_name_field_wins_over_tool_name() {
        let event = json!({
            "agent_name": "courses",
            "tool_name": "transfer_to_cultural",
            "context": { "history": [{ "name": "get_schedule" }] }
        });
        let resolution = resolve(&event).unwrap();
        assert_eq!(resolution.agent_name, "courses");
        assert_eq!(resolution.method, ResolutionMethod::AgentNameField);
    }

    #[test]
    fn test_tool_name_field() {
        let event = json!({ "agent_name": "", "tool_name": "transfer_to_cultural" });
        let resolution = resolve(&event).unwrap();
        assert_eq!(resolution.agent_name, "cultural");
        assert_eq!(resolution.method, ResolutionMethod::ToolNameField);
    }

    #[test]
    fn test_context_free_text_fallback() {
        let event = json!({
            "context": { "note": "model said: please call transfer_to_cultural now" }
        });
        let resolution = resolve(&event).unwrap();
        assert_eq!(resolution.agent_name, "cultural");
        assert_eq!(resolution.method, ResolutionMethod::ContextSearch);
    }

    #[test]
    fn test_unresolvable_events() {
        for event in [
            json!({}),
            json!(null),
            json!("transfer_to_events"),
            json!({ "context": { "history": [] } }),
            json!({ "context": { "history": [{ "name": "transfer_to_" }] } }),
            json!({ "tool_name": "lookup_events", "context": { "selectedLanguage": "FR" } }),
            json!({ "agent_name": 42, "tool_name": null }),
        ] {
            assert_eq!(resolve(&event), None, "{event}");
        }
    }

    #[test]
    fn test_target_keeps_segment_after_first_prefix() {
        assert_eq!(target_from_tool_name("transfer_to_events").as_deref(), Some("events"));
        assert_eq!(
            target_from_tool_name("transfer_to_a_transfer_to_b").as_deref(),
            Some("a_")
        );
        assert_eq!(target_from_tool_name("lookup"), None);
    }
}
