//! API Models
//!
//! Request and response bodies of the HTTP API, documented with `utoipa`.

use ifc_voice_core::{AgentDefinition, Scenario, scenario::ScenarioVariant};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Short-lived key handed to the browser.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct ClientSecret {
    #[schema(example = "ek_68af...")]
    pub value: String,
    /// Unix timestamp after which the key is rejected.
    pub expires_at: Option<i64>,
}

/// Body returned by `POST /api/session`, as minted upstream.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct EphemeralSession {
    pub id: Option<String>,
    #[schema(example = "gpt-4o-realtime-preview-2025-06-03")]
    pub model: Option<String>,
    pub client_secret: ClientSecret,
}

/// Body sent upstream to mint an ephemeral key.
#[derive(Serialize, Debug)]
pub struct MintSessionRequest<'a> {
    pub model: &'a str,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct AgentSummary {
    #[schema(example = "mainReceptionist")]
    pub name: String,
    #[schema(example = "shimmer")]
    pub voice: String,
    pub handoff_description: String,
    pub handoff_targets: Vec<String>,
}

impl From<&AgentDefinition> for AgentSummary {
    fn from(agent: &AgentDefinition) -> Self {
        Self {
            name: agent.name.clone(),
            voice: agent.voice.clone(),
            handoff_description: agent.handoff_description.clone(),
            handoff_targets: agent.handoff_targets().iter().cloned().collect(),
        }
    }
}

/// The configured scenario; `agents[0]` is the entry agent.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct AgentCatalogue {
    #[schema(example = "optimized")]
    pub variant: String,
    pub entry_agent: String,
    pub agents: Vec<AgentSummary>,
}

impl AgentCatalogue {
    pub fn new(variant: ScenarioVariant, scenario: &Scenario) -> Self {
        Self {
            variant: variant.to_string(),
            entry_agent: scenario.entry_agent().name.clone(),
            agents: scenario.agents().iter().map(AgentSummary::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
