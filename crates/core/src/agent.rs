//! Agent definitions and the hand-off graph.
//!
//! Agents are built in two phases: every [`AgentDefinition`] is first
//! constructed with an empty target set, then [`Scenario::wire`] applies a
//! declarative `(from, to)` adjacency table. Nothing mutates an agent after
//! wiring.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Prefix of the tool names the backend uses to announce a transfer.
pub const TRANSFER_TOOL_PREFIX: &str = "transfer_to_";

/// Name of the tool that transfers the conversation to `agent`.
pub fn transfer_tool_name(agent: &str) -> String {
    format!("{TRANSFER_TOOL_PREFIX}{agent}")
}

/// A named persona presented to the backend model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    /// Unique identifier, e.g. `mainReceptionist`.
    pub name: String,
    /// Backend voice identifier.
    pub voice: String,
    /// Prompt text. Never interpreted here.
    #[serde(skip)]
    pub instructions: String,
    /// Short description used when advertising a transfer to this agent.
    pub handoff_description: String,
    handoff_targets: BTreeSet<String>,
}

impl AgentDefinition {
    /// Creates an agent with no hand-off targets.
    pub fn new(
        name: impl Into<String>,
        voice: impl Into<String>,
        instructions: impl Into<String>,
        handoff_description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            voice: voice.into(),
            instructions: instructions.into(),
            handoff_description: handoff_description.into(),
            handoff_targets: BTreeSet::new(),
        }
    }

    pub fn handoff_targets(&self) -> &BTreeSet<String> {
        &self.handoff_targets
    }

    pub fn can_hand_off_to(&self, agent: &str) -> bool {
        self.handoff_targets.contains(agent)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("a scenario needs at least one agent")]
    Empty,
    #[error("duplicate agent name '{0}'")]
    DuplicateAgent(String),
    #[error("hand-off table references unknown agent '{0}'")]
    UnknownAgent(String),
    #[error("agent '{0}' cannot hand off to itself")]
    SelfHandoff(String),
}

/// An ordered, wired set of agents. The first agent is the entry agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    agents: Vec<AgentDefinition>,
}

impl Scenario {
    /// Second construction phase: sets every agent's targets from `edges`.
    ///
    /// Target sets present on the incoming definitions are discarded, so
    /// the adjacency table is the single source of truth for the graph.
    pub fn wire(
        mut agents: Vec<AgentDefinition>,
        edges: &[(&str, &str)],
    ) -> Result<Self, ScenarioError> {
        if agents.is_empty() {
            return Err(ScenarioError::Empty);
        }

        let mut seen = HashSet::new();
        for agent in &agents {
            if !seen.insert(agent.name.as_str()) {
                return Err(ScenarioError::DuplicateAgent(agent.name.clone()));
            }
        }

        for (from, to) in edges {
            if from == to {
                return Err(ScenarioError::SelfHandoff(from.to_string()));
            }
            if !seen.contains(to) {
                return Err(ScenarioError::UnknownAgent(to.to_string()));
            }
            if !seen.contains(from) {
                return Err(ScenarioError::UnknownAgent(from.to_string()));
            }
        }

        for agent in &mut agents {
            agent.handoff_targets = edges
                .iter()
                .filter(|(from, _)| *from == agent.name)
                .map(|(_, to)| to.to_string())
                .collect();
            debug!(agent = %agent.name, targets = ?agent.handoff_targets, "Wired hand-off targets");
        }

        Ok(Self { agents })
    }

    pub fn agents(&self) -> &[AgentDefinition] {
        &self.agents
    }

    /// The agent the session starts with.
    pub fn entry_agent(&self) -> &AgentDefinition {
        // `wire` rejects empty scenarios.
        &self.agents[0]
    }

    pub fn get(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.name.as_str())
    }

    /// Returns the same scenario with `name` moved to the front.
    ///
    /// The relative order of the other agents is preserved.
    pub fn rooted_at(&self, name: &str) -> Result<Self, ScenarioError> {
        let idx = self
            .agents
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| ScenarioError::UnknownAgent(name.to_string()))?;
        let mut agents = self.agents.clone();
        let agent = agents.remove(idx);
        agents.insert(0, agent);
        Ok(Self { agents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> AgentDefinition {
        AgentDefinition::new(name, "alloy", format!("You are {name}."), name)
    }

    #[test]
    fn test_wire_sets_targets_from_table() {
        let scenario = Scenario::wire(
            vec![agent("hub"), agent("a"), agent("b")],
            &[("hub", "a"), ("hub", "b"), ("a", "hub")],
        )
        .unwrap();

        let hub = scenario.get("hub").unwrap();
        assert!(hub.can_hand_off_to("a"));
        assert!(hub.can_hand_off_to("b"));
        assert_eq!(scenario.get("a").unwrap().handoff_targets().len(), 1);
        assert!(scenario.get("b").unwrap().handoff_targets().is_empty());
    }

    #[test]
    fn test_wire_rejects_bad_tables() {
        assert_eq!(Scenario::wire(vec![], &[]), Err(ScenarioError::Empty));
        assert_eq!(
            Scenario::wire(vec![agent("a"), agent("a")], &[]),
            Err(ScenarioError::DuplicateAgent("a".into()))
        );
        assert_eq!(
            Scenario::wire(vec![agent("a")], &[("a", "ghost")]),
            Err(ScenarioError::UnknownAgent("ghost".into()))
        );
        assert_eq!(
            Scenario::wire(vec![agent("a")], &[("a", "a")]),
            Err(ScenarioError::SelfHandoff("a".into()))
        );
    }

    #[test]
    fn test_rooted_at_moves_agent_to_front() {
        let scenario =
            Scenario::wire(vec![agent("hub"), agent("a"), agent("b")], &[("hub", "b")]).unwrap();

        let rooted = scenario.rooted_at("b").unwrap();
        let names: Vec<_> = rooted.names().collect();
        assert_eq!(names, vec!["b", "hub", "a"]);
        assert_eq!(rooted.entry_agent().name, "b");
        // Targets travel with their agent.
        assert!(rooted.get("hub").unwrap().can_hand_off_to("b"));

        assert!(scenario.rooted_at("nobody").is_err());
    }

    #[test]
    fn test_transfer_tool_name() {
        assert_eq!(transfer_tool_name("events"), "transfer_to_events");
    }
}
