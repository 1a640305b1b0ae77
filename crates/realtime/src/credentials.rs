//! Short-lived credential providers for `connect`.

use crate::error::CredentialError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{error, instrument};

/// Supplies the ephemeral key used to authenticate with the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn ephemeral_key(&self) -> Result<SecretString, CredentialError>;
}

/// Reads the token from a credential endpoint response body.
///
/// The token lives at `client_secret.value`; some deployments return a flat
/// `ephemeral_key` field instead.
pub fn extract_ephemeral_key(body: &Value) -> Option<String> {
    body.pointer("/client_secret/value")
        .and_then(Value::as_str)
        .or_else(|| body.get("ephemeral_key").and_then(Value::as_str))
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// Fetches a key from the same-origin `POST /api/session` endpoint.
pub struct HttpCredentialProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCredentialProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for HttpCredentialProvider {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn ephemeral_key(&self) -> Result<SecretString, CredentialError> {
        let response = self.client.post(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(%status, "Failed to fetch ephemeral key");
            return Err(CredentialError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        match extract_ephemeral_key(&body) {
            Some(key) => Ok(SecretString::from(key)),
            None => {
                error!("No ephemeral key provided by the server");
                Err(CredentialError::MissingToken)
            }
        }
    }
}

/// A key minted elsewhere, e.g. passed on the command line.
pub struct StaticCredentialProvider {
    key: SecretString,
}

impl StaticCredentialProvider {
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn ephemeral_key(&self) -> Result<SecretString, CredentialError> {
        let key = self.key.expose_secret();
        if key.is_empty() {
            return Err(CredentialError::MissingToken);
        }
        Ok(SecretString::from(key.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Answers a single HTTP request with `status` and a JSON `body`, and
    /// returns the endpoint URL.
    pub(crate) async fn serve_json_once(status: &'static str, body: Value) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let body = body.to_string();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/api/session")
    }

    #[test]
    fn test_extract_from_client_secret() {
        let body = json!({ "client_secret": { "value": "tok_123", "expires_at": 1 } });
        assert_eq!(extract_ephemeral_key(&body).as_deref(), Some("tok_123"));
    }

    #[test]
    fn test_extract_from_alternate_field() {
        let body = json!({ "ephemeral_key": "ek_456" });
        assert_eq!(extract_ephemeral_key(&body).as_deref(), Some("ek_456"));
    }

    #[test]
    fn test_extract_missing_or_empty() {
        assert_eq!(extract_ephemeral_key(&json!({})), None);
        assert_eq!(extract_ephemeral_key(&json!({ "client_secret": {} })), None);
        assert_eq!(
            extract_ephemeral_key(&json!({ "client_secret": { "value": "" } })),
            None
        );
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticCredentialProvider::new(SecretString::from("ek".to_string()));
        assert_eq!(provider.ephemeral_key().await.unwrap().expose_secret(), "ek");

        let empty = StaticCredentialProvider::new(SecretString::from(String::new()));
        assert!(matches!(
            empty.ephemeral_key().await,
            Err(CredentialError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_http_provider_reads_client_secret() {
        let endpoint =
            serve_json_once("200 OK", json!({ "client_secret": { "value": "tok_123" } })).await;
        let key = HttpCredentialProvider::new(endpoint).ephemeral_key().await.unwrap();
        assert_eq!(key.expose_secret(), "tok_123");
    }

    #[tokio::test]
    async fn test_http_provider_without_secret() {
        let endpoint = serve_json_once("200 OK", json!({})).await;
        assert!(matches!(
            HttpCredentialProvider::new(endpoint).ephemeral_key().await,
            Err(CredentialError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_http_provider_error_status() {
        let endpoint =
            serve_json_once("502 Bad Gateway", json!({ "message": "upstream down" })).await;
        assert!(matches!(
            HttpCredentialProvider::new(endpoint).ephemeral_key().await,
            Err(CredentialError::Status(502))
        ));
    }
}
