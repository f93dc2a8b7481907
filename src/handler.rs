//! The submission handler: one trigger, one request, one rendered result.
//!
//! ## Flow
//!
//! ```text
//! selection ──none──▶ alert "Choose an image first"   (no request)
//!     │
//!     └─file──▶ show "Processing…" ──▶ read ──▶ POST /predict ──▶ parse JSON ──▶ show text
//! ```
//!
//! The handler owns no global state. It snapshots the selection from a
//! [`FileProvider`] when the trigger is accepted, talks to the service through a [`PredictTransport`]
//! and writes to whatever [`ResultSink`] the caller passes in. Every
//! failure comes back as `Err(SubmitError)`; the caller decides what to do
//! with it.

use crate::config::ClientConfig;
use crate::error::SubmitError;
use crate::pipeline::encode::PredictForm;
use crate::pipeline::input::{FileProvider, PathSelection, Selection};
use crate::pipeline::render::{parse_body, render_json};
use crate::pipeline::request::{HttpTransport, PredictTransport};
use crate::sink::ResultSink;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Whether any submission is currently between trigger and result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Idle,
    InFlight,
}

/// A completed submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Name of the uploaded file.
    pub file_name: String,
    /// HTTP status the service answered with.
    pub status: u16,
    /// Parsed response body.
    pub value: Value,
    /// Exactly what was written to the sink.
    pub rendered: String,
    /// Wall-clock time from trigger to render.
    pub duration_ms: u64,
}

/// Marks one submission as in flight until dropped.
#[derive(Debug)]
pub struct InFlight {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs submissions against one file source and one transport.
pub struct SubmissionHandler {
    config: ClientConfig,
    files: Arc<dyn FileProvider>,
    transport: Arc<dyn PredictTransport>,
    in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for SubmissionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionHandler")
            .field("config", &self.config)
            .field("transport", &self.transport.url())
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

impl SubmissionHandler {
    pub fn new(
        config: ClientConfig,
        files: Arc<dyn FileProvider>,
        transport: Arc<dyn PredictTransport>,
    ) -> Self {
        Self {
            config,
            files,
            transport,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handler posting over HTTP to `config.predict_url()`.
    pub fn http(config: ClientConfig, files: Arc<dyn FileProvider>) -> Result<Self, SubmitError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(config, files, Arc::new(transport)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> HandlerState {
        if self.in_flight_count() == 0 {
            HandlerState::Idle
        } else {
            HandlerState::InFlight
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Mark a new submission as in flight.
    pub fn begin(&self) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight {
            counter: Arc::clone(&self.in_flight),
        }
    }

    /// Like [`begin`](Self::begin), but only when nothing else is in flight.
    pub fn try_begin_exclusive(&self) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight {
                counter: Arc::clone(&self.in_flight),
            })
    }

    /// Capture the file selection as it is right now.
    pub fn snapshot(&self) -> Selection {
        self.files.snapshot()
    }

    /// Handle one trigger.
    ///
    /// # Errors
    /// - [`SubmitError::NoFileSelected`] after alerting; no request made.
    /// - Read, network, timeout or parse errors. The placeholder stays on
    ///   the display and `sink.failed` is called.
    pub async fn submit(&self, sink: &dyn ResultSink) -> Result<Submission, SubmitError> {
        let ticket = self.begin();
        let selection = self.snapshot();
        self.run(ticket, selection, sink).await
    }

    /// Handle one trigger that already holds an in-flight ticket and the
    /// selection captured when it was accepted.
    pub async fn run(
        &self,
        ticket: InFlight,
        selection: Selection,
        sink: &dyn ResultSink,
    ) -> Result<Submission, SubmitError> {
        let start = Instant::now();
        let result = self.exchange(selection, sink, start).await;
        drop(ticket);

        if let Err(ref e) = result {
            if !e.is_precondition() {
                error!("Submission to {} failed: {}", self.transport.url(), e);
                sink.failed(e);
            }
        }
        result
    }

    async fn exchange(
        &self,
        selection: Selection,
        sink: &dyn ResultSink,
        start: Instant,
    ) -> Result<Submission, SubmitError> {
        // ── Step 1: Precondition ─────────────────────────────────────────
        if selection.is_empty() {
            info!("Trigger with no file selected");
            sink.alert(&self.config.no_file_message);
            return Err(SubmitError::NoFileSelected);
        }

        // ── Step 2: Placeholder ──────────────────────────────────────────
        // Every later failure leaves this on the display.
        sink.show_text(&self.config.placeholder);

        // ── Step 3: Request ──────────────────────────────────────────────
        let file = selection.load().await?.ok_or(SubmitError::NoFileSelected)?;
        let file_name = file.name.clone();
        info!("Submitting {} ({} bytes) to {}", file_name, file.bytes.len(), self.transport.url());
        let form = PredictForm::new(&self.config.field_name, file);
        let raw = self.transport.post(form).await?;

        // ── Step 4: Parse and render ─────────────────────────────────────
        let value = parse_body(&raw.body).map_err(|e| SubmitError::Parse {
            url: self.transport.url().to_string(),
            status: raw.status,
            detail: e.to_string(),
        })?;
        let rendered = render_json(&value, self.config.indent);
        sink.show_text(&rendered);

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!("Rendered {} chars", rendered.len());
        info!("{} → HTTP {} in {}ms", file_name, raw.status, duration_ms);

        Ok(Submission {
            file_name,
            status: raw.status,
            value,
            rendered,
            duration_ms,
        })
    }
}

/// Submit one file over HTTP and render the result to `sink`.
///
/// `path == None` behaves like pressing the button with an empty file
/// input.
pub async fn submit_file(
    path: Option<&Path>,
    config: &ClientConfig,
    sink: &dyn ResultSink,
) -> Result<Submission, SubmitError> {
    let selection = match path {
        Some(p) => PathSelection::with_path(p),
        None => PathSelection::new(),
    };
    let handler = SubmissionHandler::http(config.clone(), Arc::new(selection))?;
    handler.submit(sink).await
}
