//! IFC Voice API Library Crate
//!
//! This library contains the HTTP side of the voice assistant: the
//! same-origin credential endpoint that mints ephemeral realtime keys, the
//! agent catalogue, and routing. The `api` binary is a thin wrapper around
//! this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
