use tokio_tungstenite::tungstenite;

/// Errors surfaced by the session coordinator to its caller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("RealtimeSession not connected")]
    NotConnected,
    #[error("failed to obtain an ephemeral key: {0}")]
    Credential(#[from] CredentialError),
    #[error("failed to open the realtime session: {0}")]
    Backend(#[from] BackendError),
}

/// Failures of the short-lived credential fetch.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("token endpoint request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token endpoint answered with status {0}")]
    Status(u16),
    #[error("no ephemeral key provided by the server")]
    MissingToken,
}

/// Failures of the realtime backend transport.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid connection request: {0}")]
    InvalidRequest(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),
    #[error("realtime session is closed")]
    Closed,
}

impl From<tungstenite::Error> for BackendError {
    fn from(err: tungstenite::Error) -> Self {
        BackendError::WebSocket(Box::new(err))
    }
}
