//! Display-sink trait for submission output.
//!
//! A [`ResultSink`] stands in for the page's output element and its alert
//! dialog. The handler writes to it at fixed points:
//!
//! 1. `alert` when the trigger fires with no file selected (and nothing
//!    else happens),
//! 2. `show_text(placeholder)` before the file is read and sent,
//! 3. `show_text(rendered_json)` once the body parsed,
//! 4. `failed(err)` if reading, the request or the parse failed. The
//!    placeholder from step 2 is always on display by then and is left
//!    in place.
//!
//! # Example
//!
//! ```rust
//! use cheque_ocr_client::{MemorySink, ResultSink, SinkEvent};
//!
//! let sink = MemorySink::new();
//! sink.show_text("Processing…");
//! assert_eq!(sink.last_text().as_deref(), Some("Processing…"));
//! assert_eq!(sink.events(), vec![SinkEvent::Text("Processing…".into())]);
//! ```

use crate::error::SubmitError;
use std::sync::{Arc, Mutex};

/// Receives everything a submission wants the user to see.
///
/// Implementations must be `Send + Sync`: with re-triggering, several
/// submissions write to the same sink concurrently and the last write
/// wins.
pub trait ResultSink: Send + Sync {
    /// Replace the display text.
    fn show_text(&self, text: &str);

    /// Raise a blocking notification.
    fn alert(&self, message: &str);

    /// Called once when a submission with a selected file fails, always
    /// after that submission's placeholder was shown.
    fn failed(&self, error: &SubmitError) {
        let _ = error;
    }
}

/// Convenience alias for a shared sink.
pub type SharedSink = Arc<dyn ResultSink>;

impl<S: ResultSink + ?Sized> ResultSink for Arc<S> {
    fn show_text(&self, text: &str) {
        (**self).show_text(text);
    }

    fn alert(&self, message: &str) {
        (**self).alert(message);
    }

    fn failed(&self, error: &SubmitError) {
        (**self).failed(error);
    }
}

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Text(String),
    Alert(String),
    Failed(String),
}

/// Records every call in order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().clone()
    }

    /// Current display content, i.e. the last `show_text`.
    pub fn last_text(&self) -> Option<String> {
        self.lock().iter().rev().find_map(|e| match e {
            SinkEvent::Text(t) => Some(t.clone()),
            _ => None,
        })
    }

    pub fn texts(&self) -> Vec<String> {
        self.filter(|e| match e {
            SinkEvent::Text(t) => Some(t.clone()),
            _ => None,
        })
    }

    pub fn alerts(&self) -> Vec<String> {
        self.filter(|e| match e {
            SinkEvent::Alert(t) => Some(t.clone()),
            _ => None,
        })
    }

    pub fn failures(&self) -> Vec<String> {
        self.filter(|e| match e {
            SinkEvent::Failed(t) => Some(t.clone()),
            _ => None,
        })
    }

    fn filter(&self, f: impl Fn(&SinkEvent) -> Option<String>) -> Vec<String> {
        self.lock().iter().filter_map(f).collect()
    }

    fn push(&self, event: SinkEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SinkEvent>> {
        self.events.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl ResultSink for MemorySink {
    fn show_text(&self, text: &str) {
        self.push(SinkEvent::Text(text.to_string()));
    }

    fn alert(&self, message: &str) {
        self.push(SinkEvent::Alert(message.to_string()));
    }

    fn failed(&self, error: &SubmitError) {
        self.push(SinkEvent::Failed(error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TextOnly;

    impl ResultSink for TextOnly {
        fn show_text(&self, _text: &str) {}
        fn alert(&self, _message: &str) {}
    }

    #[test]
    fn default_failed_is_noop() {
        let sink = TextOnly;
        sink.failed(&SubmitError::NoFileSelected);
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.alert("Choose an image first");
        sink.show_text("Processing…");
        sink.show_text("{}");
        sink.failed(&SubmitError::Internal("boom".into()));

        assert_eq!(sink.alerts(), vec!["Choose an image first"]);
        assert_eq!(sink.texts(), vec!["Processing…", "{}"]);
        assert_eq!(sink.last_text().as_deref(), Some("{}"));
        assert_eq!(sink.failures().len(), 1);
        assert_eq!(sink.events().len(), 4);
    }

    #[test]
    fn arc_dyn_sink_forwards() {
        let mem = MemorySink::new();
        let shared: SharedSink = Arc::new(mem.clone());
        shared.show_text("x");
        assert_eq!(mem.texts(), vec!["x"]);
    }
}
