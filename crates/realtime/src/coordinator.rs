//! The session coordinator.
//!
//! Single owner of the realtime session: it enforces the
//! DISCONNECTED → CONNECTING → CONNECTED state machine, turns backend
//! callbacks into transcript updates and normalized [`SessionSignal`]s, and
//! exposes the small imperative API the UI drives (connect, push-to-talk,
//! text input, interrupt).
//!
//! Everything happens through `&mut self` on one task, so backend events
//! are applied strictly in arrival order and no locking is involved.

use crate::{
    backend::{BackendEvent, RealtimeBackend, RealtimeSession, SessionRequest, TransportEvent},
    credentials::CredentialProvider,
    error::SessionError,
};
use ifc_voice_core::{
    AudioCodec, Language, Scenario, SessionStatus,
    event_log::EventLog,
    guardrail::OutputGuardrail,
    handoff::{self, Resolution},
    transcript::{ItemStatus, Role, TranscriptItem, TranscriptStore},
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

const TRANSCRIBING_PLACEHOLDER: &str = "[Transcribing...]";
const INAUDIBLE: &str = "[inaudible]";

/// Normalized notifications for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    StatusChanged(SessionStatus),
    AgentChanged(String),
}

/// Backend parameters that do not change between connections.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub model: String,
    pub transcription_model: String,
    pub codec: AudioCodec,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-realtime-preview-2025-06-03".to_string(),
            transcription_model: "gpt-4o-mini-transcribe".to_string(),
            codec: AudioCodec::default(),
        }
    }
}

/// Inputs of a single `connect` call.
pub struct ConnectOptions {
    pub credentials: Arc<dyn CredentialProvider>,
    /// Ordered agents; the first one is the entry agent.
    pub scenario: Scenario,
    pub output_guardrails: Vec<Arc<dyn OutputGuardrail>>,
    /// Forwarded verbatim to the backend.
    pub context: Map<String, Value>,
}

impl ConnectOptions {
    pub fn new(credentials: Arc<dyn CredentialProvider>, scenario: Scenario) -> Self {
        Self {
            credentials,
            scenario,
            output_guardrails: Vec::new(),
            context: Map::new(),
        }
    }

    pub fn with_guardrail(mut self, guardrail: Arc<dyn OutputGuardrail>) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_language(self, language: Language) -> Self {
        self.with_context("selectedLanguage", Value::from(language.code()))
    }
}

struct ActiveSession {
    handle: Box<dyn RealtimeSession>,
    events: mpsc::Receiver<BackendEvent>,
    scenario: Scenario,
}

/// A conversation item as the backend reports it in its history.
struct HistoryMessage {
    item_id: String,
    role: Role,
    text: String,
    completed: bool,
}

impl HistoryMessage {
    fn parse(item: &Value) -> Option<Self> {
        if item.get("type").and_then(Value::as_str) != Some("message") {
            return None;
        }
        let item_id = item
            .get("itemId")
            .or_else(|| item.get("id"))
            .and_then(Value::as_str)?
            .to_string();
        let role = Role::from_backend(item.get("role").and_then(Value::as_str).unwrap_or_default());
        let text = item
            .get("content")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| {
                        part.get("text")
                            .or_else(|| part.get("transcript"))
                            .and_then(Value::as_str)
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        let completed = item.get("status").and_then(Value::as_str) == Some("completed");
        Some(Self {
            item_id,
            role,
            text,
            completed,
        })
    }

    fn into_item(self) -> TranscriptItem {
        let done = self.completed && !self.text.is_empty();
        let title = if self.text.is_empty() && self.role == Role::User {
            TRANSCRIBING_PLACEHOLDER.to_string()
        } else {
            self.text
        };
        let mut item = TranscriptItem::message(self.item_id, self.role, title);
        if done {
            item.status = ItemStatus::Done;
        }
        item
    }
}

pub struct SessionCoordinator {
    backend: Arc<dyn RealtimeBackend>,
    settings: SessionSettings,
    session: Option<ActiveSession>,
    status: SessionStatus,
    active_agent: Option<String>,
    muted: bool,
    talking: bool,
    transcript: TranscriptStore,
    event_log: EventLog,
    signals: Option<mpsc::UnboundedSender<SessionSignal>>,
}

impl SessionCoordinator {
    pub fn new(backend: Arc<dyn RealtimeBackend>, settings: SessionSettings) -> Self {
        Self {
            backend,
            settings,
            session: None,
            status: SessionStatus::Disconnected,
            active_agent: None,
            muted: false,
            talking: false,
            transcript: TranscriptStore::new(),
            event_log: EventLog::new(),
            signals: None,
        }
    }

    /// Registers the channel that receives status and agent changes.
    pub fn with_signals(mut self, signals: mpsc::UnboundedSender<SessionSignal>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn active_agent(&self) -> Option<&str> {
        self.active_agent.as_deref()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Whether the push-to-talk control is currently held.
    pub fn is_talking(&self) -> bool {
        self.talking
    }

    pub fn codec(&self) -> AudioCodec {
        self.settings.codec
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    /// Write access for local breadcrumbs and visibility toggles.
    pub fn transcript_mut(&mut self) -> &mut TranscriptStore {
        &mut self.transcript
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    fn emit(&self, signal: SessionSignal) {
        if let Some(tx) = &self.signals {
            if tx.send(signal).is_err() {
                warn!("Failed to deliver session signal: receiver dropped.");
            }
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        let changed = self.status != status;
        self.status = status;
        self.event_log.log_client_event(json!({}), &status.to_string());
        if changed {
            info!(%status, "Session status changed");
            self.emit(SessionSignal::StatusChanged(status));
        }
    }

    fn set_active_agent(&mut self, agent: String) {
        if self.active_agent.as_deref() == Some(agent.as_str()) {
            return;
        }
        self.active_agent = Some(agent.clone());
        self.emit(SessionSignal::AgentChanged(agent));
    }

    /// Opens the session rooted at the scenario's entry agent.
    ///
    /// Ignored while a session exists. On failure the status returns to
    /// DISCONNECTED and the error is handed back; nothing is retried.
    #[instrument(skip_all, fields(entry_agent = %options.scenario.entry_agent().name))]
    pub async fn connect(&mut self, options: ConnectOptions) -> Result<(), SessionError> {
        if self.session.is_some() {
            debug!("Session already exists, ignoring connect.");
            return Ok(());
        }

        self.set_status(SessionStatus::Connecting);

        let api_key = match options.credentials.ephemeral_key().await {
            Ok(key) => key,
            Err(e) => {
                error!(error = %e, "Failed to fetch ephemeral key");
                self.set_status(SessionStatus::Disconnected);
                return Err(e.into());
            }
        };

        let ConnectOptions {
            scenario,
            output_guardrails,
            context,
            ..
        } = options;
        let selected_language = context
            .get("selectedLanguage")
            .and_then(Value::as_str)
            .unwrap_or("none")
            .to_string();

        let request = SessionRequest {
            scenario: scenario.clone(),
            output_guardrails,
            context,
            model: self.settings.model.clone(),
            transcription_model: self.settings.transcription_model.clone(),
            codec: self.settings.codec,
        };

        let connection = match self.backend.connect(request, api_key).await {
            Ok(connection) => connection,
            Err(e) => {
                error!(error = %e, "Realtime backend connect failed");
                self.set_status(SessionStatus::Disconnected);
                return Err(e.into());
            }
        };

        let entry_agent = scenario.entry_agent().name.clone();
        self.session = Some(ActiveSession {
            handle: connection.session,
            events: connection.events,
            scenario,
        });

        // The microphone stays closed until push-to-talk opens it.
        self.mute(true);

        info!(language = %selected_language, "Triggering initial greeting");
        self.send_event_with_suffix(
            json!({
                "type": "response.create",
                "response": {
                    "modalities": ["text", "audio"],
                    "instructions": format!(
                        "Start by greeting the user. Check context.selectedLanguage ({selected_language}) and greet in that language."
                    ),
                }
            }),
            "initial greeting",
        );

        self.set_active_agent(entry_agent);
        self.set_status(SessionStatus::Connected);
        Ok(())
    }

    /// Closes the session if any and returns to DISCONNECTED. Idempotent.
    ///
    /// The state change happens before the close handshake is awaited, so a
    /// caller cancelled mid-close still observes DISCONNECTED.
    pub async fn disconnect(&mut self) {
        let session = self.session.take();
        self.talking = false;
        self.muted = false;
        self.set_status(SessionStatus::Disconnected);
        if let Some(mut session) = session {
            session.handle.close().await;
        }
    }

    /// Forwards a raw protocol event. Dropped silently when disconnected.
    pub fn send_event(&mut self, event: Value) {
        self.send_event_with_suffix(event, "");
    }

    fn send_event_with_suffix(&mut self, event: Value, suffix: &str) {
        match &mut self.session {
            Some(session) => {
                self.event_log.log_client_event(event.clone(), suffix);
                if let Err(e) = session.handle.send_event(event) {
                    warn!(error = %e, "Failed to send event to the realtime backend");
                }
            }
            None => debug!("No realtime session, dropping outbound event."),
        }
    }

    /// Sends a typed user message. Calling this while disconnected is a
    /// programming error and is reported as [`SessionError::NotConnected`].
    pub fn send_user_text(&mut self, text: &str) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NotConnected)?;
        self.event_log.log_client_event(
            json!({
                "type": "conversation.item.create",
                "item": {
                    "type": "message",
                    "role": "user",
                    "content": [{ "type": "input_text", "text": text }],
                }
            }),
            "user text",
        );
        if let Err(e) = session.handle.send_message(text) {
            warn!(error = %e, "Failed to send user text to the realtime backend");
        }
        Ok(())
    }

    /// Sets the local microphone gate. No effect when disconnected.
    pub fn mute(&mut self, muted: bool) {
        if let Some(session) = &mut self.session {
            session.handle.mute(muted);
            self.muted = muted;
        }
    }

    /// Stops any in-progress assistant utterance. No effect when disconnected.
    pub fn interrupt(&mut self) {
        if let Some(session) = &mut self.session {
            session.handle.interrupt();
        }
    }

    /// Push-to-talk pressed: cut the assistant off, clear the input buffer
    /// and open the microphone.
    pub fn push_to_talk_start(&mut self) {
        if self.status != SessionStatus::Connected {
            return;
        }
        self.interrupt();
        self.send_event_with_suffix(json!({ "type": "input_audio_buffer.clear" }), "clear PTT buffer");
        self.talking = true;
        self.mute(false);
        debug!("PTT: started speaking");
    }

    /// Push-to-talk released: close the microphone, commit the buffer and
    /// ask for a response.
    pub fn push_to_talk_stop(&mut self) {
        if self.status != SessionStatus::Connected || !self.talking {
            return;
        }
        self.talking = false;
        self.mute(true);
        self.send_event_with_suffix(json!({ "type": "input_audio_buffer.commit" }), "commit PTT");
        self.send_event_with_suffix(json!({ "type": "response.create" }), "trigger response PTT");
        debug!("PTT: stopped speaking");
    }

    /// The pointer left the control while held: close the microphone,
    /// commit what was captured and ask for a response.
    pub fn push_to_talk_cancel(&mut self) {
        if !self.talking {
            return;
        }
        self.talking = false;
        self.mute(true);
        self.send_event_with_suffix(
            json!({ "type": "input_audio_buffer.commit" }),
            "commit PTT on leave",
        );
        self.send_event_with_suffix(
            json!({ "type": "response.create" }),
            "trigger AI response on leave",
        );
        debug!("PTT: released by leaving the control");
    }

    /// Waits for the next backend event.
    ///
    /// Pending forever while disconnected. Returns `None` when the backend
    /// closed its event stream, in which case the session is dropped and
    /// the status returns to DISCONNECTED.
    pub async fn next_event(&mut self) -> Option<BackendEvent> {
        let Some(session) = self.session.as_mut() else {
            return std::future::pending().await;
        };
        if let Some(event) = session.events.recv().await {
            return Some(event);
        }

        warn!("Realtime backend event stream closed, dropping session.");
        self.disconnect().await;
        None
    }

    /// Applies one backend event.
    pub fn handle_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Error(err) => {
                warn!(error = %err, "Realtime backend error");
                self.event_log
                    .log_server_event(json!({ "type": "error", "message": err }), "");
            }
            BackendEvent::AgentHandoff(payload) => self.handle_agent_handoff(payload),
            BackendEvent::AgentToolStart { tool, arguments } => {
                self.transcript
                    .add_breadcrumb(format!("function call: {tool}"), Some(arguments));
            }
            BackendEvent::AgentToolEnd { tool, output } => {
                self.transcript
                    .add_breadcrumb(format!("function call result: {tool}"), Some(output));
            }
            BackendEvent::HistoryAdded(item) => self.handle_history_added(&item),
            BackendEvent::HistoryUpdated(items) => {
                for item in &items {
                    self.handle_history_updated(item);
                }
            }
            BackendEvent::GuardrailTripped {
                guardrail,
                item_id,
                verdict,
            } => {
                warn!(%guardrail, ?item_id, "Output guardrail tripped");
                self.transcript.add_breadcrumb(
                    format!("Output guardrail: {guardrail}"),
                    Some(json!({ "itemId": item_id, "verdict": verdict })),
                );
            }
            BackendEvent::Transport(raw) => self.handle_transport_event(raw),
        }
    }

    fn handle_agent_handoff(&mut self, payload: Value) {
        self.event_log.log_server_event(payload.clone(), "agent_handoff");

        let Some(Resolution { agent_name, method }) = handoff::resolve(&payload) else {
            error!(event = %payload, "Could not determine target agent from handoff event");
            return;
        };

        info!(agent = %agent_name, ?method, "Transferring to agent");
        if let Some(session) = &self.session {
            if !session.scenario.contains(&agent_name) {
                warn!(agent = %agent_name, "Hand-off target is not part of the scenario");
            }
        }

        self.transcript.add_breadcrumb(
            format!("Agent: {agent_name}"),
            Some(json!({ "from": self.active_agent, "method": format!("{method:?}") })),
        );
        self.set_active_agent(agent_name);
    }

    fn handle_history_added(&mut self, item: &Value) {
        let Some(message) = HistoryMessage::parse(item) else {
            return;
        };
        if self.transcript.contains(&message.item_id) {
            return;
        }
        self.transcript.append(message.into_item());
    }

    fn handle_history_updated(&mut self, item: &Value) {
        let Some(message) = HistoryMessage::parse(item) else {
            return;
        };
        if !self.transcript.contains(&message.item_id) {
            self.transcript.append(message.into_item());
        } else if !message.text.is_empty() {
            if message.completed {
                self.transcript.set_status(&message.item_id, ItemStatus::Done);
            }
            self.transcript.set_title(&message.item_id, message.text);
        }
    }

    fn handle_transport_event(&mut self, raw: Value) {
        match TransportEvent::parse(raw) {
            TransportEvent::TranscriptionCompleted {
                item_id,
                transcript,
            } => {
                let title = if transcript.trim().is_empty() {
                    INAUDIBLE.to_string()
                } else {
                    transcript
                };
                if self.transcript.set_title(&item_id, title) {
                    self.transcript.set_status(&item_id, ItemStatus::Done);
                }
            }
            TransportEvent::TranscriptionDelta { item_id, delta } => {
                self.transcript.apply_delta(&item_id, &delta);
            }
            TransportEvent::Other(raw) => self.event_log.log_server_event(raw, ""),
        }
    }
}
