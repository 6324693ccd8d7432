use crate::report::ReportContext;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Message shown when the backend gives no structured reason
pub const GENERIC_FAILURE: &str = "Failed to generate audio";

/// Why a synthesis request did not produce audio
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Non-success status with a structured `detail`, surfaced verbatim
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    /// Non-success status without a usable reason
    #[error("Failed to generate audio")]
    Status { status: u16 },

    #[error("Failed to reach synthesis endpoint: {0}")]
    Network(String),

    #[error("Malformed audio response: {0}")]
    Malformed(String),
}

/// Narrated audio returned by the synthesis endpoint
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Bytes,
    /// Media type announced by the endpoint (e.g. `audio/mpeg`)
    pub content_type: Option<String>,
}

/// Generation gateway
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait::async_trait]
pub trait SynthesisGateway: Send + Sync {
    async fn generate(&self, report: &ReportContext) -> Result<SynthesizedAudio, GenerationError>;

    /// Gateway name for logging
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Gateway that POSTs to the backend's `/audio/{daily,weekly}` endpoints
pub struct HttpSynthesisGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSynthesisGateway {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, report: &ReportContext) -> String {
        format!("{}{}", self.base_url, report.kind.endpoint())
    }
}

#[async_trait::async_trait]
impl SynthesisGateway for HttpSynthesisGateway {
    #[tracing::instrument(skip(self, report), fields(report = %report))]
    async fn generate(&self, report: &ReportContext) -> Result<SynthesizedAudio, GenerationError> {
        let url = self.endpoint_url(report);
        let body = GenerateRequest {
            date: report.date_param(),
        };

        info!("Requesting podcast synthesis from {}", url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // The body is best-effort: an unreadable error body still yields the fallback.
            let raw = response.bytes().await.unwrap_or_default();
            let error = rejection(status.as_u16(), &raw);
            warn!("Synthesis endpoint returned {}: {}", status, error);
            return Err(error);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        if bytes.is_empty() {
            return Err(GenerationError::Malformed("empty audio payload".to_string()));
        }

        info!(
            "Received {} bytes of podcast audio ({})",
            bytes.len(),
            content_type.as_deref().unwrap_or("unknown type")
        );

        Ok(SynthesizedAudio {
            bytes,
            content_type,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Build the error for a non-success response body
fn rejection(status: u16, raw: &[u8]) -> GenerationError {
    let detail = serde_json::from_slice::<ErrorBody>(raw)
        .ok()
        .and_then(|body| body.detail)
        .and_then(|detail| match detail {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        });

    match detail {
        Some(detail) => GenerationError::Rejected { status, detail },
        None => GenerationError::Status { status },
    }
}
