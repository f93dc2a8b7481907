//! Network stage: send the form to the prediction route.
//!
//! This is the only stage with network I/O. It makes exactly one attempt:
//! no retry, and no timeout unless one is configured. The HTTP status is
//! recorded but does not decide success; the JSON parse in
//! [`crate::pipeline::render`] does.

use crate::config::ClientConfig;
use crate::error::SubmitError;
use crate::pipeline::encode::PredictForm;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a [`PredictForm`] somewhere and returns what came back.
///
/// [`HttpTransport`] is the real implementation; tests and embedders can
/// substitute their own.
#[async_trait]
pub trait PredictTransport: Send + Sync {
    /// URL reported in logs and errors.
    fn url(&self) -> &str;

    /// Perform one request.
    async fn post(&self, form: PredictForm) -> Result<RawResponse, SubmitError>;
}

/// reqwest-backed transport posting to `ClientConfig::predict_url()`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    timeout_secs: Option<u64>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cheque-ocr-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SubmitError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an existing client (connection pool, proxies, TLS roots).
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            url: config.predict_url(),
            timeout_secs: config.request_timeout_secs,
        }
    }

    fn map_err(&self, e: reqwest::Error) -> SubmitError {
        match (e.is_timeout(), self.timeout_secs) {
            (true, Some(secs)) => SubmitError::Timeout {
                url: self.url.clone(),
                secs,
            },
            _ => SubmitError::Network {
                url: self.url.clone(),
                reason: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl PredictTransport for HttpTransport {
    fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, form: PredictForm) -> Result<RawResponse, SubmitError> {
        debug!("POST {} ({} bytes)", self.url, form.len());

        let mut request = self.client.post(&self.url).multipart(form.into_multipart());
        if let Some(secs) = self.timeout_secs {
            request = request.timeout(Duration::from_secs(secs));
        }

        let response = request.send().await.map_err(|e| self.map_err(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_err(e))?;

        let raw = RawResponse {
            status,
            body: body.to_vec(),
        };
        if !raw.is_success() {
            warn!("{} answered HTTP {}", self.url, raw.status);
        }
        debug!("HTTP {} with {} byte body", raw.status, raw.body.len());
        Ok(raw)
    }
}
