//! Configuration types for submitting an image to the OCR service.
//!
//! Every knob lives in [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. The defaults reproduce the browser page
//! exactly: `POST /predict`, one part named `file`, the "Processing…"
//! placeholder, two-space JSON, no timeout and no guard against
//! re-triggering.

use crate::error::SubmitError;
use serde::{Deserialize, Serialize};

/// Placeholder written to the display before the request starts.
pub const DEFAULT_PLACEHOLDER: &str = "Processing…";

/// Alert raised when the trigger fires with no file selected.
pub const DEFAULT_NO_FILE_MESSAGE: &str = "Choose an image first";

/// Configuration for a submission handler.
///
/// # Example
/// ```rust
/// use cheque_ocr_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .endpoint("http://ocr.internal:8080")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.predict_url(), "http://ocr.internal:8080/predict");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the OCR service. Default: `http://127.0.0.1:8080`.
    ///
    /// The browser page posts to a relative path, i.e. to whatever origin
    /// served it; outside a browser the origin must be spelled out.
    pub endpoint: String,

    /// Path of the prediction route. Default: `/predict`.
    pub predict_path: String,

    /// Multipart field name carrying the image. Default: `file`.
    pub field_name: String,

    /// Text written to the display while the request is in flight.
    pub placeholder: String,

    /// Alert text when no file is selected.
    pub no_file_message: String,

    /// Indent width for the rendered JSON. Default: 2.
    pub indent: usize,

    /// Per-request timeout in seconds. Default: `None` (wait forever).
    pub request_timeout_secs: Option<u64>,

    /// Ignore triggers while a submission is in flight. Default: false.
    ///
    /// Off by default: two quick triggers run two independent requests and
    /// the one that finishes last owns the display.
    pub single_flight: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            predict_path: "/predict".to_string(),
            field_name: "file".to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            no_file_message: DEFAULT_NO_FILE_MESSAGE.to_string(),
            indent: 2,
            request_timeout_secs: None,
            single_flight: false,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL the form is posted to.
    pub fn predict_url(&self) -> String {
        format!(
            "{}{}",
            self.endpoint.trim_end_matches('/'),
            self.predict_path
        )
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn predict_path(mut self, path: impl Into<String>) -> Self {
        self.config.predict_path = path.into();
        self
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.config.field_name = name.into();
        self
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.config.placeholder = text.into();
        self
    }

    pub fn no_file_message(mut self, text: impl Into<String>) -> Self {
        self.config.no_file_message = text.into();
        self
    }

    pub fn indent(mut self, width: usize) -> Self {
        self.config.indent = width;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn single_flight(mut self, v: bool) -> Self {
        self.config.single_flight = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, SubmitError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(SubmitError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if !c.predict_path.starts_with('/') {
            return Err(SubmitError::InvalidConfig(format!(
                "predict path must start with '/', got '{}'",
                c.predict_path
            )));
        }
        if c.field_name.trim().is_empty() {
            return Err(SubmitError::InvalidConfig(
                "multipart field name must not be empty".into(),
            ));
        }
        if c.indent > 16 {
            return Err(SubmitError::InvalidConfig(format!(
                "indent must be 0–16, got {}",
                c.indent
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(SubmitError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
