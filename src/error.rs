//! Error types for the cheque-ocr-client library.
//!
//! A single [`SubmitError`] covers every way a submission can end without
//! a rendered result. The kinds split into three groups:
//!
//! * **Precondition**: [`SubmitError::NoFileSelected`]. No request is
//!   made; the handler raises the "Choose an image first" alert through
//!   the sink before returning it.
//! * **Request**: the file could not be read, or the exchange with the
//!   `/predict` endpoint failed before a body arrived.
//! * **Response**: a body arrived but is not JSON.
//!
//! Callers always receive the error as `Err(SubmitError)`; nothing is
//! swallowed inside the library.

use std::path::PathBuf;
use thiserror::Error;

/// Every failure a submission can produce.
#[derive(Debug, Error)]
pub enum SubmitError {
    // ── Precondition ──────────────────────────────────────────────────────
    /// The trigger fired while the file input was empty.
    #[error("No file selected")]
    NoFileSelected,

    // ── Selected-file errors ──────────────────────────────────────────────
    /// The selected path no longer exists.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the selected file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Request errors ────────────────────────────────────────────────────
    /// Connection refused, DNS failure, reset mid-body, and the like.
    #[error("Request to '{url}' failed: {reason}\nIs the OCR service running?")]
    Network { url: String, reason: String },

    /// The optional request timeout expired.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    // ── Response errors ───────────────────────────────────────────────────
    /// The response body is not valid JSON.
    #[error("Response from '{url}' (HTTP {status}) is not valid JSON: {detail}")]
    Parse {
        url: String,
        status: u16,
        detail: String,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// A crop could not be decoded or written.
    #[error("Failed to save crop '{field}': {detail}")]
    CropFailed { field: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SubmitError {
    /// `true` when the submission never reached the network.
    pub fn is_precondition(&self) -> bool {
        matches!(self, SubmitError::NoFileSelected)
    }
}
