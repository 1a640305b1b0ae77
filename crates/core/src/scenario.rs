//! The Institut français du Cambodge agent scenario.
//!
//! Two hand-off graphs exist. The legacy graph routes every transfer
//! through the receptionist hub; the optimized graph is fully connected.
//! Which one is built is an explicit [`ScenarioVariant`] passed to
//! [`institut_francais_cambodge`], so both can be constructed side by side.

use crate::agent::{AgentDefinition, Scenario, ScenarioError};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const COMPANY_NAME: &str = "Institut français du Cambodge";

pub const MAIN_RECEPTIONIST: &str = "mainReceptionist";
pub const COURSES: &str = "courses";
pub const EVENTS: &str = "events";
pub const CULTURAL: &str = "cultural";

const GUARDRAILS: &str = include_str!("../prompts/guardrails.md");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioVariant {
    Legacy,
    #[default]
    Optimized,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown scenario variant '{0}', expected 'legacy' or 'optimized'")]
pub struct UnknownVariant(pub String);

impl FromStr for ScenarioVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" => Ok(ScenarioVariant::Legacy),
            "optimized" => Ok(ScenarioVariant::Optimized),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for ScenarioVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioVariant::Legacy => write!(f, "legacy"),
            ScenarioVariant::Optimized => write!(f, "optimized"),
        }
    }
}

const LEGACY_EDGES: &[(&str, &str)] = &[
    (MAIN_RECEPTIONIST, COURSES),
    (MAIN_RECEPTIONIST, EVENTS),
    (MAIN_RECEPTIONIST, CULTURAL),
    (COURSES, MAIN_RECEPTIONIST),
    (EVENTS, MAIN_RECEPTIONIST),
    (CULTURAL, MAIN_RECEPTIONIST),
];

const OPTIMIZED_EDGES: &[(&str, &str)] = &[
    (MAIN_RECEPTIONIST, COURSES),
    (MAIN_RECEPTIONIST, EVENTS),
    (MAIN_RECEPTIONIST, CULTURAL),
    (COURSES, MAIN_RECEPTIONIST),
    (COURSES, EVENTS),
    (COURSES, CULTURAL),
    (EVENTS, MAIN_RECEPTIONIST),
    (EVENTS, COURSES),
    (EVENTS, CULTURAL),
    (CULTURAL, MAIN_RECEPTIONIST),
    (CULTURAL, COURSES),
    (CULTURAL, EVENTS),
];

/// The `(from, to)` hand-off table of a variant.
pub fn adjacency(variant: ScenarioVariant) -> &'static [(&'static str, &'static str)] {
    match variant {
        ScenarioVariant::Legacy => LEGACY_EDGES,
        ScenarioVariant::Optimized => OPTIMIZED_EDGES,
    }
}

fn legacy_agents() -> Vec<AgentDefinition> {
    vec![
        AgentDefinition::new(
            MAIN_RECEPTIONIST,
            "alloy",
            include_str!("../prompts/legacy/mainReceptionist.md"),
            "Main receptionist of Institut français du Cambodge - handles general inquiries in FR/KH/EN",
        ),
        AgentDefinition::new(
            COURSES,
            "nova",
            include_str!("../prompts/legacy/courses.md"),
            "Language course specialist - provides detailed information about French and Khmer classes",
        ),
        AgentDefinition::new(
            EVENTS,
            "shimmer",
            include_str!("../prompts/legacy/events.md"),
            "Cultural events specialist - information about exhibitions, concerts, cinema, and library",
        ),
        AgentDefinition::new(
            CULTURAL,
            "echo",
            include_str!("../prompts/legacy/cultural.md"),
            "Cultural exchange specialist - scholarships, study abroad, partnerships, and cultural projects",
        ),
    ]
}

fn optimized_agents() -> Vec<AgentDefinition> {
    let with_guardrails = |prompt: &str| format!("{prompt}\n{GUARDRAILS}");
    vec![
        AgentDefinition::new(
            MAIN_RECEPTIONIST,
            "shimmer",
            with_guardrails(include_str!("../prompts/optimized/mainReceptionist.md")),
            "Multilingual AI receptionist - Expert in FR/KH/EN with cultural awareness",
        ),
        AgentDefinition::new(
            COURSES,
            "nova",
            with_guardrails(include_str!("../prompts/optimized/courses.md")),
            "Education specialist - Expert in French/Khmer courses, DELF/DALF, and language pedagogy",
        ),
        AgentDefinition::new(
            EVENTS,
            "echo",
            with_guardrails(include_str!("../prompts/optimized/events.md")),
            "Cultural coordinator - Events, cinema, exhibitions, concerts, and workshops expert",
        ),
        AgentDefinition::new(
            CULTURAL,
            "alloy",
            with_guardrails(include_str!("../prompts/optimized/cultural.md")),
            "Campus France advisor - Study abroad, scholarships, cultural exchanges, and career guidance",
        ),
    ]
}

/// Builds the institute's scenario for `variant`, entry agent first.
pub fn institut_francais_cambodge(variant: ScenarioVariant) -> Result<Scenario, ScenarioError> {
    let agents = match variant {
        ScenarioVariant::Legacy => legacy_agents(),
        ScenarioVariant::Optimized => optimized_agents(),
    };
    Scenario::wire(agents, adjacency(variant))
}
