//! OpenAI Realtime backend over a WebSocket.
//!
//! The socket is split into a writer task fed by an unbounded channel and a
//! reader task that runs every server event through a [`SessionRouter`].
//! The router owns the multi-agent behavior: it advertises the active
//! agent's `transfer_to_*` tools, answers transfer calls by re-configuring
//! the session for the new agent, and runs output guardrails on finished
//! assistant transcripts.

use crate::{
    backend::{BackendConnection, BackendEvent, RealtimeBackend, RealtimeSession, SessionRequest},
    error::BackendError,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use ifc_voice_core::{
    AgentDefinition, AudioCodec, Scenario,
    agent::{TRANSFER_TOOL_PREFIX, transfer_tool_name},
    guardrail::OutputGuardrail,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use std::{collections::VecDeque, sync::Arc};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
        protocol::Message as WsMessage,
    },
};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

const EVENT_BUFFER: usize = 256;

/// Conversation items the router remembers for in-place updates.
const HISTORY_LIMIT: usize = 64;

/// What a server event turns into: replies for the socket and callbacks
/// for the coordinator.
#[derive(Debug, Default, PartialEq)]
pub struct Dispatch {
    pub outbound: Vec<Value>,
    pub events: Vec<BackendEvent>,
}

/// Per-session multi-agent state driven by server events.
pub struct SessionRouter {
    scenario: Scenario,
    active_agent: String,
    context: Map<String, Value>,
    codec: AudioCodec,
    transcription_model: String,
    guardrails: Vec<Arc<dyn OutputGuardrail>>,
    /// Most recent normalized items, oldest first.
    history: VecDeque<Value>,
}

impl SessionRouter {
    pub fn new(request: SessionRequest) -> Self {
        let active_agent = request.scenario.entry_agent().name.clone();
        Self {
            scenario: request.scenario,
            active_agent,
            context: request.context,
            codec: request.codec,
            transcription_model: request.transcription_model,
            guardrails: request.output_guardrails,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    pub fn active_agent(&self) -> &str {
        &self.active_agent
    }

    fn remember(&mut self, item: Value) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(item);
    }

    fn history_item_mut(&mut self, item_id: &str) -> Option<&mut Value> {
        self.history
            .iter_mut()
            .rev()
            .find(|item| item.get("itemId").and_then(Value::as_str) == Some(item_id))
    }

    /// Stores `item` in place of the remembered item with the same id.
    fn upsert(&mut self, item: Value) {
        let item_id = item.get("itemId").and_then(Value::as_str).map(str::to_string);
        match item_id.as_deref().and_then(|id| self.history_item_mut(id)) {
            Some(existing) => *existing = item,
            None => self.remember(item),
        }
    }

    fn agent(&self) -> &AgentDefinition {
        self.scenario
            .get(&self.active_agent)
            .unwrap_or_else(|| self.scenario.entry_agent())
    }

    /// `session.update` configuring the socket for the active agent.
    ///
    /// Turn detection is disabled: turns are delimited by push-to-talk.
    pub fn session_update(&self) -> Value {
        let agent = self.agent();
        let context = serde_json::to_string_pretty(&self.context).unwrap_or_default();
        let tools: Vec<Value> = agent
            .handoff_targets()
            .iter()
            .map(|target| {
                let description = self
                    .scenario
                    .get(target)
                    .map(|t| t.handoff_description.as_str())
                    .unwrap_or_default();
                json!({
                    "type": "function",
                    "name": transfer_tool_name(target),
                    "description": format!("Transfer the conversation to {target}. {description}"),
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "rationale_for_handoff": { "type": "string" },
                            "conversation_context": { "type": "string" }
                        },
                        "required": ["rationale_for_handoff", "conversation_context"]
                    }
                })
            })
            .collect();

        json!({
            "type": "session.update",
            "session": {
                "modalities": ["text", "audio"],
                "instructions": format!("{}\n\n# Session context\n{context}", agent.instructions),
                "voice": agent.voice,
                "input_audio_format": self.codec.audio_format(),
                "output_audio_format": self.codec.audio_format(),
                "input_audio_transcription": { "model": self.transcription_model },
                "turn_detection": null,
                "tools": tools,
                "tool_choice": "auto"
            }
        })
    }

    pub fn on_server_event(&mut self, raw: Value) -> Dispatch {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut dispatch = Dispatch::default();

        match kind.as_str() {
            "error" => {
                let error = raw.get("error").cloned().unwrap_or(Value::Null);
                dispatch.events.push(BackendEvent::Error(error));
                return dispatch;
            }
            "conversation.item.created" => {
                if let Some(item) = raw.get("item") {
                    let item = normalize_item(item);
                    self.remember(item.clone());
                    dispatch.events.push(BackendEvent::HistoryAdded(item));
                }
            }
            "response.output_item.done" => {
                if let Some(item) = raw.get("item") {
                    let item = normalize_item(item);
                    self.upsert(item.clone());
                    dispatch.events.push(BackendEvent::HistoryUpdated(vec![item]));
                }
            }
            "conversation.item.input_audio_transcription.completed" => {
                self.on_input_transcription(&raw, &mut dispatch)
            }
            "response.function_call_arguments.done" => self.on_function_call(&raw, &mut dispatch),
            "response.audio_transcript.done" => self.run_guardrails(&raw, &mut dispatch),
            _ => {}
        }

        dispatch.events.push(BackendEvent::Transport(raw));
        dispatch
    }

    fn on_function_call(&mut self, raw: &Value, dispatch: &mut Dispatch) {
        let name = raw.get("name").and_then(Value::as_str).unwrap_or_default();
        let call_id = raw.get("call_id").and_then(Value::as_str).unwrap_or_default();
        let arguments = raw
            .get("arguments")
            .and_then(Value::as_str)
            .and_then(|args| serde_json::from_str::<Value>(args).ok())
            .unwrap_or(Value::Null);

        let call = json!({
            "type": "function_call",
            "name": name,
            "callId": call_id,
            "arguments": arguments,
        });
        self.remember(call.clone());

        let target = name
            .strip_prefix(TRANSFER_TOOL_PREFIX)
            .filter(|target| self.agent().can_hand_off_to(target) && self.scenario.contains(target));

        match target {
            Some(target) => {
                let from = std::mem::replace(&mut self.active_agent, target.to_string());
                info!(%from, to = %target, "Handing off");
                dispatch.outbound.push(function_call_output(
                    call_id,
                    json!({ "destination_agent": target }),
                ));
                dispatch.outbound.push(self.session_update());
                dispatch.outbound.push(json!({ "type": "response.create" }));
                dispatch.events.push(BackendEvent::AgentHandoff(json!({
                    "context": {
                        "history": [call],
                        "selectedLanguage": self.context.get("selectedLanguage"),
                    },
                    "agent_name": target,
                    "tool_name": name,
                })));
            }
            None => {
                warn!(tool = %name, agent = %self.active_agent, "Tool is not available to the active agent");
                let output = json!({ "error": format!("Tool {name} is not available to {}", self.active_agent) });
                dispatch.events.push(BackendEvent::AgentToolStart {
                    tool: name.to_string(),
                    arguments,
                });
                dispatch.events.push(BackendEvent::AgentToolEnd {
                    tool: name.to_string(),
                    output: output.clone(),
                });
                dispatch.outbound.push(function_call_output(call_id, output));
                dispatch.outbound.push(json!({ "type": "response.create" }));
            }
        }
    }

    /// A user audio item got its transcript: the item is final.
    fn on_input_transcription(&mut self, raw: &Value, dispatch: &mut Dispatch) {
        let Some(item_id) = raw.get("item_id").and_then(Value::as_str) else {
            return;
        };
        let transcript = raw.get("transcript").and_then(Value::as_str).unwrap_or_default();
        let content = json!([{ "type": "input_audio", "transcript": transcript }]);

        let item = match self.history_item_mut(item_id) {
            Some(existing) => {
                existing["content"] = content;
                existing["status"] = json!("completed");
                existing.clone()
            }
            None => {
                let item = json!({
                    "itemId": item_id,
                    "type": "message",
                    "role": "user",
                    "content": content,
                    "status": "completed",
                });
                self.remember(item.clone());
                item
            }
        };
        dispatch.events.push(BackendEvent::HistoryUpdated(vec![item]));
    }

    fn run_guardrails(&self, raw: &Value, dispatch: &mut Dispatch) {
        let transcript = raw.get("transcript").and_then(Value::as_str).unwrap_or_default();
        let item_id = raw.get("item_id").and_then(Value::as_str).map(str::to_string);

        let mut tripped = false;
        for guardrail in &self.guardrails {
            let verdict = guardrail.evaluate(transcript);
            if !verdict.tripped {
                continue;
            }
            tripped = true;
            dispatch.events.push(BackendEvent::GuardrailTripped {
                guardrail: guardrail.name().to_string(),
                item_id: item_id.clone(),
                verdict: serde_json::to_value(&verdict).unwrap_or(Value::Null),
            });
        }
        if tripped {
            dispatch.outbound.push(json!({ "type": "response.cancel" }));
        }
    }
}

/// Reshapes a wire conversation item into the history form the
/// coordinator reads (`itemId`, `type`, `role`, `content`, `status`).
///
/// Typed text is final as soon as it is created, even when the server
/// leaves `status` out.
fn normalize_item(item: &Value) -> Value {
    let content = item.get("content").cloned().unwrap_or_else(|| json!([]));
    let typed = content.as_array().is_some_and(|parts| {
        !parts.is_empty()
            && parts
                .iter()
                .all(|part| part.get("type").and_then(Value::as_str) == Some("input_text"))
    });
    let status = match item.get("status") {
        Some(status) if !status.is_null() => status.clone(),
        _ if typed => json!("completed"),
        _ => Value::Null,
    };
    json!({
        "itemId": item.get("id"),
        "type": item.get("type"),
        "role": item.get("role"),
        "name": item.get("name"),
        "content": content,
        "status": status,
    })
}

fn function_call_output(call_id: &str, output: Value) -> Value {
    json!({
        "type": "conversation.item.create",
        "item": {
            "type": "function_call_output",
            "call_id": call_id,
            "output": output.to_string(),
        }
    })
}

fn is_audio_append(event: &Value) -> bool {
    event.get("type").and_then(Value::as_str) == Some("input_audio_buffer.append")
}

enum Outbound {
    Event(Value),
    Close,
}

/// Opens sessions against the OpenAI Realtime WebSocket endpoint.
pub struct OpenAiRealtimeBackend {
    url: String,
}

impl OpenAiRealtimeBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for OpenAiRealtimeBackend {
    fn default() -> Self {
        Self::new(DEFAULT_REALTIME_URL)
    }
}

#[async_trait]
impl RealtimeBackend for OpenAiRealtimeBackend {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn connect(
        &self,
        request: SessionRequest,
        api_key: SecretString,
    ) -> Result<BackendConnection, BackendError> {
        let url = format!("{}?model={}", self.url, request.model);
        let mut ws_request = url.into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;
        ws_request.headers_mut().insert(AUTHORIZATION, bearer);
        ws_request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (ws_stream, _) = connect_async(ws_request).await?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        info!("Connected to OpenAI Realtime API.");

        let mut router = SessionRouter::new(request);
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        outbound_tx
            .send(Outbound::Event(router.session_update()))
            .map_err(|_| BackendError::Closed)?;

        let writer = tokio::spawn(async move {
            while let Some(outbound) = outbound_rx.recv().await {
                match outbound {
                    Outbound::Event(event) => {
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(error = %e, "Failed to encode client event");
                                continue;
                            }
                        };
                        if let Err(e) = ws_tx.send(WsMessage::Text(text.into())).await {
                            warn!(error = %e, "Failed to send client event, stopping writer");
                            break;
                        }
                    }
                    Outbound::Close => {
                        if let Err(e) = ws_tx.close().await {
                            debug!(error = %e, "Error while closing the realtime socket");
                        }
                        break;
                    }
                }
            }
        });

        let replies = outbound_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = ws_rx.next().await {
                let text = match message {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Close(frame)) => {
                        info!(?frame, "Realtime server closed the connection");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "Realtime socket error");
                        let _ = events_tx
                            .send(BackendEvent::Error(json!({ "message": e.to_string() })))
                            .await;
                        break;
                    }
                };

                let raw: Value = match serde_json::from_str(&text) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed server event");
                        continue;
                    }
                };

                let Dispatch { outbound, events } = router.on_server_event(raw);
                for event in outbound {
                    if replies.send(Outbound::Event(event)).is_err() {
                        debug!("Writer stopped, dropping reply");
                    }
                }
                for event in events {
                    if events_tx.send(event).await.is_err() {
                        debug!("Session coordinator dropped the event stream");
                        return;
                    }
                }
            }
        });

        Ok(BackendConnection {
            session: Box::new(OpenAiSession {
                outbound: outbound_tx,
                writer: Some(writer),
                reader: Some(reader),
                muted: false,
            }),
            events: events_rx,
        })
    }
}

/// Control handle of an open OpenAI Realtime socket.
pub struct OpenAiSession {
    outbound: mpsc::UnboundedSender<Outbound>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    /// Gates microphone audio appended through `send_event`.
    muted: bool,
}

impl OpenAiSession {
    fn push(&self, event: Value) -> Result<(), BackendError> {
        self.outbound
            .send(Outbound::Event(event))
            .map_err(|_| BackendError::Closed)
    }
}

#[async_trait]
impl RealtimeSession for OpenAiSession {
    async fn close(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        if self.outbound.send(Outbound::Close).is_err() {
            debug!("Realtime writer already stopped");
        }
        if let Err(e) = writer.await {
            warn!(error = %e, "Realtime writer task failed");
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }

    fn mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn interrupt(&mut self) {
        if let Err(e) = self.push(json!({ "type": "response.cancel" })) {
            debug!(error = %e, "Cannot interrupt a closed session");
        }
    }

    fn send_event(&mut self, event: Value) -> Result<(), BackendError> {
        if self.muted && is_audio_append(&event) {
            return Ok(());
        }
        self.push(event)
    }

    fn send_message(&mut self, text: &str) -> Result<(), BackendError> {
        self.push(json!({
            "type": "conversation.item.create",
            "item": {
                "type": "message",
                "role": "user",
                "content": [{ "type": "input_text", "text": text }],
            }
        }))?;
        self.push(json!({ "type": "response.create" }))
    }
}

impl Drop for OpenAiSession {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_voice_core::{
        guardrail::ForbiddenTopicGuardrail,
        handoff,
        scenario::{COMPANY_NAME, ScenarioVariant, institut_francais_cambodge},
    };

    fn router(variant: ScenarioVariant) -> SessionRouter {
        let mut context = Map::new();
        context.insert("selectedLanguage".into(), json!("KH"));
        SessionRouter::new(SessionRequest {
            scenario: institut_francais_cambodge(variant).unwrap(),
            output_guardrails: vec![Arc::new(ForbiddenTopicGuardrail::for_company(COMPANY_NAME))],
            context,
            model: "gpt-4o-realtime-preview-2025-06-03".into(),
            transcription_model: "gpt-4o-mini-transcribe".into(),
            codec: AudioCodec::Pcmu,
        })
    }

    fn transfer_call(name: &str) -> Value {
        json!({
            "type": "response.function_call_arguments.done",
            "name": name,
            "call_id": "call_1",
            "arguments": "{\"rationale_for_handoff\":\"asked about classes\"}"
        })
    }

    #[test]
    fn test_session_update_for_entry_agent() {
        let router = router(ScenarioVariant::Optimized);
        let update = router.session_update();
        let session = &update["session"];

        assert_eq!(update["type"], "session.update");
        assert_eq!(session["voice"], "shimmer");
        assert_eq!(session["input_audio_format"], "g711_ulaw");
        assert_eq!(session["output_audio_format"], "g711_ulaw");
        assert!(session["turn_detection"].is_null());
        assert_eq!(session["input_audio_transcription"]["model"], "gpt-4o-mini-transcribe");
        assert!(
            session["instructions"]
                .as_str()
                .unwrap()
                .contains("\"selectedLanguage\": \"KH\"")
        );

        let tools: Vec<&str> = session["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            tools,
            vec!["transfer_to_courses", "transfer_to_cultural", "transfer_to_events"]
        );
    }

    #[test]
    fn test_allowed_transfer_switches_agent() {
        let mut router = router(ScenarioVariant::Optimized);
        let dispatch = router.on_server_event(transfer_call("transfer_to_courses"));

        assert_eq!(router.active_agent(), "courses");
        assert_eq!(dispatch.outbound.len(), 3);
        assert_eq!(dispatch.outbound[0]["item"]["type"], "function_call_output");
        assert_eq!(dispatch.outbound[0]["item"]["call_id"], "call_1");
        assert_eq!(dispatch.outbound[1]["session"]["voice"], "nova");
        assert_eq!(dispatch.outbound[2]["type"], "response.create");

        let handoff = dispatch
            .events
            .iter()
            .find_map(|e| match e {
                BackendEvent::AgentHandoff(payload) => Some(payload),
                _ => None,
            })
            .unwrap();
        let resolution = handoff::resolve(handoff).unwrap();
        assert_eq!(resolution.agent_name, "courses");
        assert_eq!(resolution.method, handoff::ResolutionMethod::History);
    }

    #[test]
    fn test_legacy_specialist_cannot_reach_sibling() {
        let mut router = router(ScenarioVariant::Legacy);
        router.on_server_event(transfer_call("transfer_to_courses"));
        assert_eq!(router.active_agent(), "courses");

        let dispatch = router.on_server_event(transfer_call("transfer_to_events"));
        assert_eq!(router.active_agent(), "courses");
        assert!(
            !dispatch
                .events
                .iter()
                .any(|e| matches!(e, BackendEvent::AgentHandoff(_)))
        );
        assert!(matches!(
            &dispatch.events[1],
            BackendEvent::AgentToolEnd { output, .. } if output.get("error").is_some()
        ));
        assert_eq!(dispatch.outbound.len(), 2);

        router.on_server_event(transfer_call("transfer_to_mainReceptionist"));
        assert_eq!(router.active_agent(), "mainReceptionist");
    }

    #[test]
    fn test_unknown_tool_reports_start_and_end() {
        let mut router = router(ScenarioVariant::Optimized);
        let dispatch = router.on_server_event(json!({
            "type": "response.function_call_arguments.done",
            "name": "lookup_schedule",
            "call_id": "call_2",
            "arguments": "{\"level\":\"B1\"}"
        }));

        assert!(matches!(
            &dispatch.events[0],
            BackendEvent::AgentToolStart { tool, arguments }
                if tool == "lookup_schedule" && arguments["level"] == "B1"
        ));
        assert_eq!(router.active_agent(), "mainReceptionist");
    }

    #[test]
    fn test_guardrail_trip_cancels_response() {
        let mut router = router(ScenarioVariant::Optimized);
        let dispatch = router.on_server_event(json!({
            "type": "response.audio_transcript.done",
            "item_id": "item_5",
            "transcript": "Let me tell you about politics."
        }));

        assert!(matches!(
            &dispatch.events[0],
            BackendEvent::GuardrailTripped { guardrail, item_id, .. }
                if guardrail == "forbidden_topics" && item_id.as_deref() == Some("item_5")
        ));
        assert_eq!(dispatch.outbound, vec![json!({ "type": "response.cancel" })]);

        let clean = router.on_server_event(json!({
            "type": "response.audio_transcript.done",
            "item_id": "item_6",
            "transcript": "Les cours commencent lundi."
        }));
        assert!(clean.outbound.is_empty());
        assert_eq!(clean.events.len(), 1);
    }

    #[test]
    fn test_item_created_becomes_history() {
        let mut router = router(ScenarioVariant::Optimized);
        let dispatch = router.on_server_event(json!({
            "type": "conversation.item.created",
            "item": {
                "id": "item_1", "type": "message", "role": "user", "status": "completed",
                "content": [{ "type": "input_audio", "transcript": null }]
            }
        }));

        match &dispatch.events[0] {
            BackendEvent::HistoryAdded(item) => {
                assert_eq!(item["itemId"], "item_1");
                assert_eq!(item["role"], "user");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(dispatch.events[1], BackendEvent::Transport(_)));
    }

    #[test]
    fn test_input_transcription_updates_history_item() {
        let mut router = router(ScenarioVariant::Optimized);
        router.on_server_event(json!({
            "type": "conversation.item.created",
            "item": {
                "id": "item_1", "type": "message", "role": "user", "status": "completed",
                "content": [{ "type": "input_audio", "transcript": null }]
            }
        }));

        let dispatch = router.on_server_event(json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "item_id": "item_1",
            "transcript": "Bonjour"
        }));

        match &dispatch.events[0] {
            BackendEvent::HistoryUpdated(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0]["itemId"], "item_1");
                assert_eq!(items[0]["role"], "user");
                assert_eq!(items[0]["status"], "completed");
                assert_eq!(items[0]["content"][0]["transcript"], "Bonjour");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(dispatch.events[1], BackendEvent::Transport(_)));
        assert_eq!(router.history.len(), 1);
    }

    #[test]
    fn test_output_item_done_updates_history() {
        let mut router = router(ScenarioVariant::Optimized);
        router.on_server_event(json!({
            "type": "conversation.item.created",
            "item": {
                "id": "item_2", "type": "message", "role": "assistant", "status": "in_progress",
                "content": []
            }
        }));

        let dispatch = router.on_server_event(json!({
            "type": "response.output_item.done",
            "item": {
                "id": "item_2", "type": "message", "role": "assistant", "status": "completed",
                "content": [{ "type": "audio", "transcript": "Les cours commencent lundi." }]
            }
        }));

        assert!(matches!(
            &dispatch.events[0],
            BackendEvent::HistoryUpdated(items)
                if items[0]["status"] == "completed"
                    && items[0]["content"][0]["transcript"] == "Les cours commencent lundi."
        ));
        assert_eq!(router.history.len(), 1);
    }

    #[test]
    fn test_typed_text_item_is_completed_on_creation() {
        let mut router = router(ScenarioVariant::Optimized);
        let dispatch = router.on_server_event(json!({
            "type": "conversation.item.created",
            "item": {
                "id": "item_3", "type": "message", "role": "user",
                "content": [{ "type": "input_text", "text": "Quels cours ?" }]
            }
        }));

        assert!(matches!(
            &dispatch.events[0],
            BackendEvent::HistoryAdded(item) if item["status"] == "completed"
        ));
    }

    #[test]
    fn test_history_is_capped_and_handoff_carries_only_the_call() {
        let mut router = router(ScenarioVariant::Optimized);
        for i in 0..HISTORY_LIMIT + 10 {
            router.on_server_event(json!({
                "type": "conversation.item.created",
                "item": { "id": format!("item_{i}"), "type": "message", "role": "user", "content": [] }
            }));
        }
        assert_eq!(router.history.len(), HISTORY_LIMIT);
        assert_eq!(router.history[0]["itemId"], "item_10");

        let dispatch = router.on_server_event(transfer_call("transfer_to_events"));
        let handoff = dispatch
            .events
            .iter()
            .find_map(|e| match e {
                BackendEvent::AgentHandoff(payload) => Some(payload),
                _ => None,
            })
            .unwrap();
        let history = handoff["context"]["history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["name"], "transfer_to_events");
        assert_eq!(router.history.len(), HISTORY_LIMIT);
    }

    #[test]
    fn test_error_event_is_surfaced() {
        let mut router = router(ScenarioVariant::Optimized);
        let dispatch = router.on_server_event(json!({
            "type": "error",
            "error": { "message": "bad request" }
        }));
        assert_eq!(
            dispatch.events,
            vec![BackendEvent::Error(json!({ "message": "bad request" }))]
        );
    }

    #[test]
    fn test_audio_append_gated_by_mute() {
        assert!(is_audio_append(&json!({ "type": "input_audio_buffer.append", "audio": "" })));
        assert!(!is_audio_append(&json!({ "type": "input_audio_buffer.commit" })));
    }
}
