//! Trigger sources and the dispatch loop.
//!
//! [`dispatch`] waits on a [`TriggerSource`] and starts one submission per
//! trigger without waiting for earlier ones to finish. Two quick triggers
//! therefore run two requests at the same time, and whichever finishes
//! last makes the final write to the sink. All submissions are polled on
//! the caller's task (`FuturesUnordered`), so nothing needs `'static`.
//!
//! The selection is captured when a trigger is accepted, before its
//! submission is first polled. A `clear` or `select` that the source
//! applies afterwards only affects later triggers.
//!
//! With `ClientConfig::single_flight` set, a trigger arriving while a
//! submission is in flight is dropped instead.

use crate::error::SubmitError;
use crate::handler::{Submission, SubmissionHandler};
use crate::pipeline::input::PathSelection;
use crate::sink::ResultSink;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

/// A user action asking for a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trigger;

/// Produces triggers until it is exhausted.
#[async_trait]
pub trait TriggerSource: Send {
    /// Wait for the next trigger; `None` ends dispatching.
    ///
    /// Must be cancel-safe: [`dispatch`] drops the pending call whenever a
    /// submission completes first.
    async fn next_trigger(&mut self) -> Option<Trigger>;
}

/// Counts of what happened during one [`dispatch`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub triggered: usize,
    pub succeeded: usize,
    pub no_file: usize,
    pub failed: usize,
    /// Triggers dropped by the single-flight guard.
    pub ignored: usize,
}

impl DispatchSummary {
    fn record(&mut self, result: &Result<Submission, SubmitError>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(SubmitError::NoFileSelected) => self.no_file += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Run submissions for every trigger until the source ends and all
/// in-flight submissions have finished.
pub async fn dispatch<T>(
    handler: &SubmissionHandler,
    triggers: &mut T,
    sink: &dyn ResultSink,
) -> DispatchSummary
where
    T: TriggerSource + ?Sized,
{
    let single_flight = handler.config().single_flight;
    let mut pending = FuturesUnordered::new();
    let mut summary = DispatchSummary::default();
    let mut open = true;

    loop {
        tokio::select! {
            trigger = triggers.next_trigger(), if open => match trigger {
                Some(Trigger) => {
                    summary.triggered += 1;
                    let ticket = if single_flight {
                        handler.try_begin_exclusive()
                    } else {
                        Some(handler.begin())
                    };
                    match ticket {
                        Some(ticket) => {
                            let selection = handler.snapshot();
                            pending.push(handler.run(ticket, selection, sink));
                        }
                        None => {
                            warn!("Submission already in flight; trigger ignored");
                            summary.ignored += 1;
                        }
                    }
                }
                None => {
                    debug!("Trigger source closed; {} submission(s) outstanding", pending.len());
                    open = false;
                }
            },
            Some(result) = pending.next(), if !pending.is_empty() => summary.record(&result),
            else => break,
        }
    }

    summary
}

/// Trigger source fed by [`TriggerHandle::fire`].
#[derive(Debug)]
pub struct ChannelTrigger {
    rx: mpsc::UnboundedReceiver<Trigger>,
}

/// Cloneable sender side of a [`ChannelTrigger`].
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::UnboundedSender<Trigger>,
}

impl ChannelTrigger {
    pub fn new() -> (TriggerHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TriggerHandle { tx }, Self { rx })
    }
}

impl TriggerHandle {
    /// Fire a trigger. Returns `false` once the source has been dropped.
    pub fn fire(&self) -> bool {
        self.tx.send(Trigger).is_ok()
    }
}

#[async_trait]
impl TriggerSource for ChannelTrigger {
    async fn next_trigger(&mut self) -> Option<Trigger> {
        self.rx.recv().await
    }
}

/// One line of the interactive command language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(String),
    Clear,
    Run,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        Some(match word.to_lowercase().as_str() {
            "select" | "file" if !rest.is_empty() => Command::Select(rest.to_string()),
            "clear" => Command::Clear,
            "run" | "submit" => Command::Run,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        })
    }
}

/// Line-driven source: `select <path>`, `clear`, `run`, `quit`.
///
/// `select` and `clear` update the shared [`PathSelection`]; only `run`
/// yields a trigger. End of input behaves like `quit`.
pub struct CommandTrigger<R> {
    lines: LinesStream<R>,
    selection: PathSelection,
}

impl<R: AsyncBufRead + Unpin + Send> CommandTrigger<R> {
    pub fn new(reader: R, selection: PathSelection) -> Self {
        Self {
            lines: LinesStream::new(reader.lines()),
            selection,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> TriggerSource for CommandTrigger<R> {
    async fn next_trigger(&mut self) -> Option<Trigger> {
        while let Some(line) = self.lines.next().await {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Failed to read command: {}", e);
                    return None;
                }
            };
            match Command::parse(&line) {
                Some(Command::Select(path)) => {
                    debug!("Selected {}", path);
                    self.selection.select(path);
                }
                Some(Command::Clear) => self.selection.clear(),
                Some(Command::Run) => return Some(Trigger),
                Some(Command::Quit) => return None,
                Some(Command::Unknown(l)) => warn!("Unknown command: {}", l),
                None => {}
            }
        }
        None
    }
}
