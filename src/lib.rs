//! # cheque-ocr-client
//!
//! Submit one image to a cheque-OCR `/predict` endpoint and render the
//! JSON reply as indented text.
//!
//! ## Flow
//!
//! ```text
//! trigger
//!  │
//!  ├─ 1. Select  capture the zero-or-one selected file (alert if none)
//!  ├─ 2. Show    "Processing…" placeholder
//!  ├─ 3. Encode  read the file into one multipart part named `file`
//!  ├─ 4. POST    {endpoint}/predict, one attempt, no retry
//!  └─ 5. Render  JSON → 2-space text, key order preserved
//! ```
//!
//! The handler reads from a [`FileProvider`], posts through a
//! [`PredictTransport`] and writes to a [`ResultSink`]. [`dispatch`] binds
//! it to a [`TriggerSource`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cheque_ocr_client::{submit_file, ClientConfig, MemorySink};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .endpoint("http://localhost:8080")
//!         .build()?;
//!     let sink = MemorySink::new();
//!     let done = submit_file(Some(Path::new("cheque.jpg")), &config, &sink).await?;
//!     println!("{}", done.rendered);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cheque-ocr` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod prediction;
pub mod sink;
pub mod trigger;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_NO_FILE_MESSAGE, DEFAULT_PLACEHOLDER};
pub use error::SubmitError;
pub use handler::{submit_file, HandlerState, InFlight, Submission, SubmissionHandler};
pub use pipeline::encode::PredictForm;
pub use pipeline::input::{FileProvider, PathSelection, SelectedFile, Selection};
pub use pipeline::render::{parse_body, render_json};
pub use pipeline::request::{HttpTransport, PredictTransport, RawResponse};
pub use prediction::{ChequeFields, ChequePrediction};
pub use sink::{MemorySink, ResultSink, SharedSink, SinkEvent};
pub use trigger::{
    dispatch, ChannelTrigger, Command, CommandTrigger, DispatchSummary, Trigger, TriggerHandle,
    TriggerSource,
};
