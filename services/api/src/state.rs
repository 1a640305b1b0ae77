//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared
//! resources handed to every handler.

use crate::config::Config;
use ifc_voice_core::Scenario;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Client used to mint ephemeral keys upstream.
    pub http: reqwest::Client,
    /// The scenario selected by `SCENARIO_VARIANT`.
    pub scenario: Arc<Scenario>,
}
