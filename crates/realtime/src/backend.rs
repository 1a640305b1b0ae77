//! The contract between the session coordinator and a realtime voice
//! backend.
//!
//! A backend opens a session and hands back two things: a control handle
//! ([`RealtimeSession`]) and a channel of [`BackendEvent`]s that the
//! coordinator drains in arrival order.

use crate::error::BackendError;
use async_trait::async_trait;
use ifc_voice_core::{AudioCodec, Scenario, guardrail::OutputGuardrail};
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a backend needs to open a session rooted at the entry agent.
#[derive(Clone)]
pub struct SessionRequest {
    pub scenario: Scenario,
    pub output_guardrails: Vec<Arc<dyn OutputGuardrail>>,
    /// Free-form record forwarded verbatim (e.g. `selectedLanguage`).
    pub context: Map<String, Value>,
    pub model: String,
    pub transcription_model: String,
    pub codec: AudioCodec,
}

/// Lifecycle callbacks emitted by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Error(Value),
    /// Raw hand-off payload. Its shape is not guaranteed.
    AgentHandoff(Value),
    AgentToolStart { tool: String, arguments: Value },
    AgentToolEnd { tool: String, output: Value },
    HistoryUpdated(Vec<Value>),
    HistoryAdded(Value),
    GuardrailTripped {
        guardrail: String,
        item_id: Option<String>,
        verdict: Value,
    },
    /// Raw server event not consumed by the session layer.
    Transport(Value),
}

/// Sub-cases of a transport event that the transcript cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    TranscriptionCompleted { item_id: String, transcript: String },
    TranscriptionDelta { item_id: String, delta: String },
    Other(Value),
}

impl TransportEvent {
    pub fn parse(event: Value) -> Self {
        let kind = event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let item_id = event.get("item_id").and_then(Value::as_str).map(str::to_string);

        match (kind.as_str(), item_id) {
            (
                "conversation.item.input_audio_transcription.completed"
                | "response.audio_transcript.done",
                Some(item_id),
            ) => {
                let transcript = event
                    .get("transcript")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                TransportEvent::TranscriptionCompleted { item_id, transcript }
            }
            ("response.audio_transcript.delta", Some(item_id)) => {
                let delta = event
                    .get("delta")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                TransportEvent::TranscriptionDelta { item_id, delta }
            }
            _ => TransportEvent::Other(event),
        }
    }
}

/// Control handle of one open backend session.
#[async_trait]
pub trait RealtimeSession: Send {
    /// Tears down the transport. Safe to call more than once.
    async fn close(&mut self);
    fn mute(&mut self, muted: bool);
    fn interrupt(&mut self);
    /// Raw protocol pass-through.
    fn send_event(&mut self, event: Value) -> Result<(), BackendError>;
    /// Adds a user text message and asks for a response.
    fn send_message(&mut self, text: &str) -> Result<(), BackendError>;
}

pub struct BackendConnection {
    pub session: Box<dyn RealtimeSession>,
    pub events: mpsc::Receiver<BackendEvent>,
}

/// Opens realtime voice sessions.
#[async_trait]
pub trait RealtimeBackend: Send + Sync {
    async fn connect(
        &self,
        request: SessionRequest,
        api_key: SecretString,
    ) -> Result<BackendConnection, BackendError>;
}
