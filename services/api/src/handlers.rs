//! Axum Handlers for the REST API
//!
//! The browser never sees the long-lived API key: it calls
//! `POST /api/session` on this service, which mints a short-lived key
//! upstream and returns it. The handlers use `utoipa` doc comments to
//! generate OpenAPI documentation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    models::{AgentCatalogue, EphemeralSession, ErrorResponse, HealthResponse, MintSessionRequest},
    state::AppState,
};

pub enum ApiError {
    /// The upstream key service failed or answered with an unusable body.
    BadGateway(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadGateway(message) => {
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Mint an ephemeral realtime key for the browser.
#[utoipa::path(
    post,
    path = "/api/session",
    responses(
        (status = 200, description = "Ephemeral session minted", body = EphemeralSession),
        (status = 502, description = "Upstream key service failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EphemeralSession>, ApiError> {
    let url = state.config.realtime_sessions_url();
    let response = state
        .http
        .post(&url)
        .bearer_auth(state.config.openai_api_key.expose_secret())
        .json(&MintSessionRequest {
            model: &state.config.realtime_model,
        })
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to reach the upstream key service");
            ApiError::BadGateway("The realtime key service is unreachable.".to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        warn!(%status, "Upstream key service rejected the request");
        return Err(ApiError::BadGateway(format!(
            "The realtime key service answered with status {}.",
            status.as_u16()
        )));
    }

    let session: EphemeralSession = response.json().await.map_err(|e| {
        warn!(error = %e, "Upstream key service returned no client secret");
        ApiError::BadGateway("No ephemeral key provided by the server.".to_string())
    })?;

    info!(model = ?session.model, "Ephemeral session minted");
    Ok(Json(session))
}

/// List the agents of the configured scenario.
#[utoipa::path(
    get,
    path = "/api/agents",
    responses(
        (status = 200, description = "Configured agent scenario", body = AgentCatalogue)
    )
)]
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<AgentCatalogue> {
    Json(AgentCatalogue::new(
        state.config.scenario_variant,
        &state.scenario,
    ))
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
