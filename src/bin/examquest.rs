//! CLI binary for examquest.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, drives one upload session, and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use examquest::{
    render, write_output, AnalysisConfig, ExamQuestError, ObserverHandle, OutputFormat,
    ResultTab, SelectedFile, SessionObserver, SessionStatus, UploadController,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Spinner observer ─────────────────────────────────────────────────────────

/// Renders session transitions as a single spinner line on stderr.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:30.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("ExamQuest");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl SessionObserver for SpinnerObserver {
    fn on_transition(&self, status: SessionStatus, progress: u8) {
        self.bar.set_position(progress as u64);
        let msg = match status {
            SessionStatus::Idle => "Waiting…",
            SessionStatus::Uploading => "Reading image…",
            SessionStatus::Compressing => "Compressing image…",
            SessionStatus::Analyzing => "Extracting text and generating smart solutions…",
            SessionStatus::Completed => "Done",
            SessionStatus::Error => "Processing failed",
        };
        self.bar.set_message(msg);
        // Idle here means the session was cancelled.
        if status.is_terminal() || status == SessionStatus::Idle {
            self.bar.finish_and_clear();
        }
    }

    fn on_error(&self, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(message));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a photo, show insights + smart solutions
  examquest paper.jpg

  # Show the extracted text only
  examquest --tab text paper.jpg

  # Everything as Markdown into a file
  examquest --tab all --format markdown paper.jpg -o paper.md

  # Raw structured result
  examquest --format json https://example.com/guess-paper.png

  # Extension-less input
  examquest --content-type image/jpeg ./scan

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google AI Studio API key (API_KEY also accepted)
  EXAMQUEST_MODEL         Override the model ID
  RUST_LOG                Override the log filter
"#;

/// Analyse photographed exam guess papers with a multimodal LLM.
#[derive(Parser, Debug)]
#[command(
    name = "examquest",
    version,
    about = "Analyse photographed exam guess papers with a multimodal LLM",
    long_about = "Extract the text of an exam guess paper photo (English, Hindi, or both), \
summarise it, list its key topics, and get expert answers to its most important questions.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image path or HTTP/HTTPS URL.
    input: String,

    /// Write the rendered result to this file instead of stdout.
    #[arg(short, long, env = "EXAMQUEST_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, env = "EXAMQUEST_FORMAT", value_enum, default_value = "text")]
    format: FormatArg,

    /// Result tab to show: analysis (solutions), text (extracted), or all.
    #[arg(long, env = "EXAMQUEST_TAB", value_enum, default_value = "analysis")]
    tab: TabArg,

    /// Gemini model ID.
    #[arg(long, env = "EXAMQUEST_MODEL", default_value = examquest::config::DEFAULT_MODEL)]
    model: String,

    /// Gemini REST base URL.
    #[arg(long, env = "EXAMQUEST_BASE_URL", default_value = examquest::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Maximum image width after compression, in pixels.
    #[arg(long, env = "EXAMQUEST_MAX_WIDTH", default_value_t = examquest::config::DEFAULT_MAX_WIDTH)]
    max_width: u32,

    /// JPEG quality for the compressed upload (1–100).
    #[arg(long, env = "EXAMQUEST_QUALITY", default_value_t = examquest::config::DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Sampling temperature (0.0–2.0). Service default when unset.
    #[arg(long, env = "EXAMQUEST_TEMPERATURE")]
    temperature: Option<f32>,

    /// Timeout for the AI call in seconds.
    #[arg(long, env = "EXAMQUEST_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout for URL inputs in seconds.
    #[arg(long, env = "EXAMQUEST_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Override the declared content type of the input (e.g. image/png).
    #[arg(long)]
    content_type: Option<String>,

    /// Disable the progress spinner.
    #[arg(long, env = "EXAMQUEST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EXAMQUEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EXAMQUEST_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Text,
    Markdown,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TabArg {
    Analysis,
    Text,
    All,
}

impl From<TabArg> for ResultTab {
    fn from(v: TabArg) -> Self {
        match v {
            TabArg::Analysis => ResultTab::Analysis,
            TabArg::Text => ResultTab::Text,
            TabArg::All => ResultTab::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides all the feedback that matters, so library INFO
    // logs are suppressed while it is active.
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

    let observer: Option<ObserverHandle> = if show_progress {
        Some(SpinnerObserver::new() as Arc<dyn SessionObserver>)
    } else {
        None
    };

    let config = build_config(&cli, observer)?;
    let mut controller =
        UploadController::from_config(config).context("Failed to set up the AI provider")?;

    // Ctrl-C tears the session back down to idle.
    let cancel = controller.cancel_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut file = SelectedFile::from_input(&cli.input);
    if let Some(ref ct) = cli.content_type {
        file = file.with_content_type(ct.clone());
    }

    let result = match controller.select(file).await {
        Ok(result) => result,
        Err(ExamQuestError::Cancelled) => {
            eprintln!("Cancelled.");
            return Ok(ExitCode::from(130));
        }
        Err(e) => {
            // The spinner observer has already shown the message.
            if !show_progress {
                eprintln!("{} {}", red("✘"), e.user_message());
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let rendered = render(&result, cli.format.into(), cli.tab.into());

    if let Some(ref path) = cli.output {
        write_output(path, &rendered)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, observer: Option<ObserverHandle>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .model(cli.model.clone())
        .base_url(cli.base_url.clone())
        .max_width(cli.max_width)
        .jpeg_quality(cli.quality)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(obs) = observer {
        builder = builder.observer(obs);
    }

    builder.build().context("Invalid configuration")
}
