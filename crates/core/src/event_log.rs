//! Append-only diagnostic log of protocol messages in both directions.

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent by this client to the backend.
    Client,
    /// Received from the backend.
    Server,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEvent {
    pub id: u64,
    pub direction: Direction,
    pub event_name: String,
    pub payload: Value,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<LoggedEvent>,
}

/// `type` field of the payload followed by the optional suffix.
fn event_name(payload: &Value, suffix: &str) -> String {
    let kind = payload.get("type").and_then(Value::as_str).unwrap_or("");
    match (kind.is_empty(), suffix.is_empty()) {
        (_, true) => kind.to_string(),
        (true, false) => suffix.to_string(),
        (false, false) => format!("{kind} {suffix}"),
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, direction: Direction, payload: Value, suffix: &str) {
        let event_name = event_name(&payload, suffix);
        debug!(?direction, event = %event_name, "Protocol event");
        self.entries.push(LoggedEvent {
            id: self.entries.len() as u64,
            direction,
            event_name,
            payload,
            timestamp: Local::now(),
        });
    }

    pub fn log_client_event(&mut self, payload: Value, suffix: &str) {
        self.push(Direction::Client, payload, suffix);
    }

    pub fn log_server_event(&mut self, payload: Value, suffix: &str) {
        self.push(Direction::Server, payload, suffix);
    }

    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
