//! Typed view of the cheque-OCR service's `/predict` reply.
//!
//! The service answers with
//!
//! ```json
//! {
//!   "file": "cheque_01.jpg",
//!   "predictions": {"amount": "1250.00", "amount_words": "...", "date": "2024-03-01", "payee": "..."},
//!   "crops": {"amount": "data:image/png;base64,iVBOR..."}
//! }
//! ```
//!
//! Rendering never depends on this module: the JSON text is produced from
//! the raw value. This is only for callers that want the fields or the
//! crop images.

use crate::error::SubmitError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Field names in the order the service detects them.
pub const FIELDS: [&str; 4] = ["amount", "amount_words", "date", "payee"];

/// Text read from each detected region. Undetected fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequeFields {
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub amount_words: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub payee: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequePrediction {
    /// Upload name echoed back by the service.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub predictions: ChequeFields,
    /// Field name → `data:image/png;base64,…`.
    #[serde(default)]
    pub crops: BTreeMap<String, String>,
}

impl ChequePrediction {
    /// Interpret a response value; `None` unless it is an object with a
    /// `predictions` key of the expected shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if !obj.contains_key("predictions") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// `(name, text)` pairs in [`FIELDS`] order.
    pub fn fields(&self) -> [(&'static str, &str); 4] {
        let p = &self.predictions;
        [
            (FIELDS[0], p.amount.as_str()),
            (FIELDS[1], p.amount_words.as_str()),
            (FIELDS[2], p.date.as_str()),
            (FIELDS[3], p.payee.as_str()),
        ]
    }

    /// Number of fields the service read any text for.
    pub fn detected(&self) -> usize {
        self.fields().iter().filter(|(_, t)| !t.is_empty()).count()
    }

    /// Decode every crop and write it to `dir/<field>.png`.
    ///
    /// Creates `dir` if needed. Returns the written paths in field order.
    pub async fn save_crops(&self, dir: &Path) -> Result<Vec<PathBuf>, SubmitError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| SubmitError::CropFailed {
                field: "*".into(),
                detail: format!("cannot create {}: {e}", dir.display()),
            })?;

        let mut written = Vec::with_capacity(self.crops.len());
        for (field, uri) in &self.crops {
            if !is_safe_name(field) {
                return Err(SubmitError::CropFailed {
                    field: field.clone(),
                    detail: "field name is not a safe file name".into(),
                });
            }
            let bytes = decode_data_uri(field, uri)?;
            let path = dir.join(format!("{field}.png"));
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|e| SubmitError::CropFailed {
                    field: field.clone(),
                    detail: e.to_string(),
                })?;
            debug!("Wrote crop {} ({} bytes)", path.display(), bytes.len());
            written.push(path);
        }

        info!("Saved {} crop(s) to {}", written.len(), dir.display());
        Ok(written)
    }
}

/// Decode a `data:<mime>;base64,<payload>` URI.
pub fn decode_data_uri(field: &str, uri: &str) -> Result<Vec<u8>, SubmitError> {
    let fail = |detail: &str| SubmitError::CropFailed {
        field: field.to_string(),
        detail: detail.to_string(),
    };

    let rest = uri.strip_prefix("data:").ok_or_else(|| fail("not a data URI"))?;
    let (header, payload) = rest.split_once(',').ok_or_else(|| fail("data URI has no payload"))?;
    if !header.ends_with(";base64") {
        return Err(fail("data URI is not base64-encoded"));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| fail(&format!("invalid base64: {e}")))
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
