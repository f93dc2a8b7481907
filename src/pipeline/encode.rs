//! Payload encoding: `SelectedFile` → single-part multipart form.
//!
//! The form carries exactly one part. The bytes are passed through
//! untouched and the part keeps the original file name, which the service
//! echoes back in its `file` key.

use crate::pipeline::input::SelectedFile;
use reqwest::multipart::{Form, Part};
use tracing::debug;

/// The request payload for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictForm {
    /// Multipart field name (`file`).
    pub field: String,
    /// File name attached to the part.
    pub file_name: String,
    /// Part content.
    pub bytes: Vec<u8>,
}

impl PredictForm {
    pub fn new(field: impl Into<String>, file: SelectedFile) -> Self {
        Self {
            field: field.into(),
            file_name: file.name,
            bytes: file.bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the payload into a reqwest form with one part.
    pub fn into_multipart(self) -> Form {
        debug!(
            "Encoding part '{}' ({}, {} bytes)",
            self.field,
            self.file_name,
            self.bytes.len()
        );
        let part = Part::bytes(self.bytes).file_name(self.file_name);
        Form::new().part(self.field, part)
    }
}
