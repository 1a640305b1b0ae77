//! Domain model for the Institut français du Cambodge voice assistant.
//!
//! Everything in this crate is free of I/O: agent definitions and the
//! scenario graph, hand-off target resolution, the transcript store, the
//! diagnostic event log, and output guardrails. The `ifc-realtime` crate
//! drives these from live backend events.

pub mod agent;
pub mod event_log;
pub mod generic_types;
pub mod guardrail;
pub mod handoff;
pub mod scenario;
pub mod transcript;

pub use agent::{AgentDefinition, Scenario, ScenarioError};
pub use generic_types::{AudioCodec, Language, SessionStatus};
