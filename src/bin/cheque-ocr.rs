//! CLI binary for cheque-ocr-client.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, renders the display sink on the terminal and exits with
//! a status that scripts can check.

use anyhow::{Context, Result};
use clap::Parser;
use cheque_ocr_client::{
    dispatch, submit_file, ChequePrediction, ClientConfig, CommandTrigger, PathSelection,
    ResultSink, SubmissionHandler, SubmitError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Exit status when the trigger fires with no file selected.
const EXIT_NO_FILE: i32 = 2;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Terminal sink ────────────────────────────────────────────────────────────

/// Spinner plus how many submissions are showing the placeholder.
struct Spinner {
    bar: Option<ProgressBar>,
    waiting: usize,
}

/// Terminal display: the placeholder becomes a spinner on stderr, the
/// rendered JSON goes to stdout (or `--output`), alerts and failures go to
/// stderr.
struct CliSink {
    placeholder: String,
    output: Option<PathBuf>,
    show_progress: bool,
    quiet: bool,
    spinner: Mutex<Spinner>,
}

impl CliSink {
    fn new(config: &ClientConfig, output: Option<PathBuf>, show_progress: bool, quiet: bool) -> Self {
        Self {
            placeholder: config.placeholder.clone(),
            output,
            show_progress,
            quiet,
            spinner: Mutex::new(Spinner {
                bar: None,
                waiting: 0,
            }),
        }
    }

    fn start_waiting(&self) {
        let mut s = self.spinner.lock().unwrap_or_else(|p| p.into_inner());
        s.waiting += 1;
        let waiting = s.waiting;
        if !self.show_progress {
            if !self.quiet {
                eprintln!("{}", dim(&self.placeholder));
            }
            return;
        }
        let bar = s.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        if waiting > 1 {
            bar.set_message(format!("{} ({} in flight)", self.placeholder, waiting));
        } else {
            bar.set_message(self.placeholder.clone());
        }
    }

    #[cfg(test)]
    fn waiting(&self) -> usize {
        self.spinner.lock().unwrap_or_else(|p| p.into_inner()).waiting
    }

    fn stop_waiting(&self) {
        let mut s = self.spinner.lock().unwrap_or_else(|p| p.into_inner());
        s.waiting = s.waiting.saturating_sub(1);
        if s.waiting == 0 {
            if let Some(bar) = s.bar.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn write_result(&self, text: &str) {
        match self.output {
            Some(ref path) => {
                if let Err(e) = std::fs::write(path, format!("{text}\n")) {
                    error!("Failed to write {}: {}", path.display(), e);
                }
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                if let Err(e) = writeln!(handle, "{text}") {
                    error!("Failed to write to stdout: {}", e);
                }
            }
        }
    }
}

impl ResultSink for CliSink {
    fn show_text(&self, text: &str) {
        if text == self.placeholder {
            self.start_waiting();
        } else {
            self.stop_waiting();
            self.write_result(text);
        }
    }

    fn alert(&self, message: &str) {
        eprintln!("{} {}", red("✘"), bold(message));
    }

    // The handler shows the placeholder before anything can fail, so every
    // failure ends one wait.
    fn failed(&self, err: &SubmitError) {
        self.stop_waiting();
        eprintln!("{} {}", red("✘"), red(&err.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Submit one cheque image (stdout)
  cheque-ocr cheque.jpg

  # Against a remote service, result to a file
  cheque-ocr --endpoint http://ocr.internal:8080 cheque.jpg -o result.json

  # Save the detected field crops as PNG files
  cheque-ocr cheque.jpg --save-crops crops/

  # Interactive: drive the handler from stdin like the web page
  cheque-ocr --interactive
    > select scans/cheque_01.jpg
    > run
    > clear
    > run          # → "Choose an image first"
    > quit

ENVIRONMENT VARIABLES:
  CHEQUE_OCR_ENDPOINT       Base URL of the OCR service
  CHEQUE_OCR_PATH           Prediction route (default: /predict)
  CHEQUE_OCR_FIELD          Multipart field name (default: file)
  CHEQUE_OCR_TIMEOUT        Request timeout in seconds (default: none)
  CHEQUE_OCR_INDENT         JSON indent width, 0-16 (default: 2)
  CHEQUE_OCR_OUTPUT         Write the result to this file
  CHEQUE_OCR_SAVE_CROPS     Save field crops to this directory
  CHEQUE_OCR_SINGLE_FLIGHT  Ignore `run` while a request is in flight
  CHEQUE_OCR_NO_PROGRESS    Disable the spinner
  CHEQUE_OCR_VERBOSE        Enable debug logging
  CHEQUE_OCR_QUIET          Only print the result and errors
  RUST_LOG                  Override the log filter (e.g. cheque_ocr_client=debug)

EXIT STATUS:
  0  result rendered
  1  request, response or I/O failure
  2  no file selected
"#;

/// Submit a cheque image to an OCR /predict endpoint and print the JSON reply.
#[derive(Parser, Debug)]
#[command(
    name = "cheque-ocr",
    version,
    about = "Submit a cheque image to an OCR /predict endpoint and print the JSON reply",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file to submit. Omit it to reproduce the "no file" alert.
    file: Option<PathBuf>,

    /// Base URL of the OCR service.
    #[arg(long, env = "CHEQUE_OCR_ENDPOINT", default_value = "http://127.0.0.1:8080")]
    endpoint: String,

    /// Prediction route, appended to the endpoint.
    #[arg(long, env = "CHEQUE_OCR_PATH", default_value = "/predict")]
    path: String,

    /// Multipart field name for the image.
    #[arg(long, env = "CHEQUE_OCR_FIELD", default_value = "file")]
    field: String,

    /// Request timeout in seconds. Default: wait indefinitely.
    #[arg(long, env = "CHEQUE_OCR_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// JSON indent width (0 = compact).
    #[arg(long, env = "CHEQUE_OCR_INDENT", default_value_t = 2,
          value_parser = clap::value_parser!(u64).range(0..=16))]
    indent: u64,

    /// Write the rendered JSON to this file instead of stdout.
    #[arg(short, long, env = "CHEQUE_OCR_OUTPUT")]
    output: Option<PathBuf>,

    /// Decode the returned field crops into PNG files in this directory.
    #[arg(long, env = "CHEQUE_OCR_SAVE_CROPS", conflicts_with = "interactive")]
    save_crops: Option<PathBuf>,

    /// Read `select <path>` / `clear` / `run` / `quit` commands from stdin.
    #[arg(short, long)]
    interactive: bool,

    /// Ignore `run` while a submission is still in flight.
    #[arg(long, env = "CHEQUE_OCR_SINGLE_FLIGHT")]
    single_flight: bool,

    /// Disable the spinner.
    #[arg(long, env = "CHEQUE_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CHEQUE_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the result and errors.
    #[arg(short, long, env = "CHEQUE_OCR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers the in-flight wait, so library INFO logs are
    // suppressed while it is active.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let sink = CliSink::new(&config, cli.output.clone(), show_progress, cli.quiet);

    // ── Interactive mode ─────────────────────────────────────────────────
    if cli.interactive {
        let selection = match cli.file {
            Some(ref p) => PathSelection::with_path(p),
            None => PathSelection::new(),
        };
        let handler = SubmissionHandler::http(config, Arc::new(selection.clone()))
            .context("Failed to create HTTP client")?;

        if !cli.quiet {
            eprintln!(
                "{}",
                dim("commands: select <path> | clear | run | quit")
            );
        }

        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut triggers = CommandTrigger::new(stdin, selection);
        let summary = dispatch(&handler, &mut triggers, &sink).await;

        if !cli.quiet {
            eprintln!(
                "{} {} run(s): {} rendered, {} failed, {} without a file, {} ignored",
                if summary.failed == 0 { green("✔") } else { red("⚠") },
                summary.triggered,
                summary.succeeded,
                summary.failed,
                summary.no_file,
                summary.ignored,
            );
        }
        return Ok(());
    }

    // ── One-shot mode ────────────────────────────────────────────────────
    let done = match submit_file(cli.file.as_deref(), &config, &sink).await {
        Ok(done) => done,
        Err(SubmitError::NoFileSelected) => std::process::exit(EXIT_NO_FILE),
        Err(e) => return Err(e).context("Submission failed"),
    };

    let prediction = ChequePrediction::from_value(&done.value);

    if let Some(ref dir) = cli.save_crops {
        match prediction {
            Some(ref p) => {
                let written = p.save_crops(dir).await.context("Failed to save crops")?;
                if !cli.quiet {
                    eprintln!("   {} crop(s) → {}", written.len(), bold(&dir.display().to_string()));
                }
            }
            None => eprintln!("{} response has no cheque crops; nothing saved", red("⚠")),
        }
    }

    if !cli.quiet {
        let detected = prediction
            .as_ref()
            .map(|p| format!("  {}/4 fields", p.detected()))
            .unwrap_or_default();
        eprintln!(
            "{}  {}  HTTP {}  {}ms{}",
            green("✔"),
            done.file_name,
            done.status,
            done.duration_ms,
            dim(&detected),
        );
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .endpoint(&cli.endpoint)
        .predict_path(&cli.path)
        .field_name(&cli.field)
        .indent(cli.indent as usize)
        .single_flight(cli.single_flight);

    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}
