// Backend API client
// GET /api/{tours|hotels|festivals} returns a full collection,
// POST /api/{bookings|inquiries|custom-tours|guides} returns the created record.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::ResourceKind;
use crate::config::ClientConfig;

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    // The server answered with a non-success status
    #[error("API error: {status_code} - {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status_code: u16,
        message: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Client error: {0}")]
    Client(String),
}

impl ApiError {
    // Text for the error notification: the server's reason if it gave one
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// Pulls a human-readable reason out of `{"message": ..}` or `{"error": ..}`
pub fn parse_error_message(body: &[u8]) -> Option<String> {
    let payload: ErrorPayload = serde_json::from_slice(body).ok()?;
    payload
        .message
        .or(payload.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

// Record echoed back by the backend after a successful POST
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub status: Option<String>,
    // Kept as the server sent it; formats vary between endpoints
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ServerRecord {
    // Any 2xx is an acknowledgement, so a body that does not fit the record shape
    // is kept raw instead of failing the submission
    pub fn from_acknowledgement(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }
        match serde_json::from_slice::<ServerRecord>(body) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "unexpected acknowledgement body, keeping it raw");
                let raw = serde_json::from_slice::<Value>(body)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()));
                let mut record = Self::default();
                if let Value::Object(map) = &raw {
                    record.id = map.get("id").cloned().unwrap_or_default();
                }
                record.fields.insert("raw".to_string(), raw);
                record
            }
        }
    }

    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    // Raw JSON body of a read-only collection
    async fn fetch_collection(&self, kind: ResourceKind) -> Result<Bytes, ApiError>;

    async fn create(
        &self,
        kind: ResourceKind,
        body: Value,
        idempotency_key: &str,
    ) -> Result<ServerRecord, ApiError>;
}

pub struct HttpApiClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, kind: ResourceKind) -> String {
        format!("{}{}", self.config.base_url, kind.api_path())
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.config.timeout_ms)
        } else {
            ApiError::Network(error.to_string())
        }
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Bytes, ApiError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if status.is_success() {
            return Ok(body);
        }

        let message = parse_error_message(&body);
        warn!(status = status.as_u16(), ?message, "request rejected by server");
        Err(ApiError::Rejected {
            status_code: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn fetch_collection(&self, kind: ResourceKind) -> Result<Bytes, ApiError> {
        let url = self.url(kind);
        debug!(%url, "fetching collection");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_body(response).await
    }

    async fn create(
        &self,
        kind: ResourceKind,
        body: Value,
        idempotency_key: &str,
    ) -> Result<ServerRecord, ApiError> {
        let url = self.url(kind);
        debug!(%url, idempotency_key, "posting record");

        let response = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body = self.read_body(response).await?;
        Ok(ServerRecord::from_acknowledgement(&body))
    }
}
