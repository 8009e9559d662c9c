//! CLI binary for pdf2cards.
//!
//! A thin shim over the library crate that maps CLI flags to `CardConfig`,
//! then either prints cards for one document or starts the HTTP server.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2cards::{
    generate, write_atomic, CardConfig, CardProgressCallback, CardSchema, DocumentSource,
    ExtractorBackend, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the PDF is read, then a bar over the chunks.
struct CliProgressCallback {
    bar: ProgressBar,
    chunk_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Extracting");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            chunk_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} chunks  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Generating");
    }

    fn chunk_elapsed_secs(&self) -> f64 {
        self.chunk_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl CardProgressCallback for CliProgressCallback {
    fn on_extraction_complete(&self, chars: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracted {chars} characters"))
        ));
    }

    fn on_generation_start(&self, total_chunks: usize) {
        self.activate_bar(total_chunks);
    }

    fn on_chunk_start(&self, index: usize, total: usize) {
        if let Ok(mut started) = self.chunk_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("chunk {}/{}", index + 1, total));
    }

    fn on_chunk_complete(&self, index: usize, total: usize, response_len: usize) {
        self.bar.println(format!(
            "  {} Chunk {:>2}/{:<2}  {:<8}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{response_len:>5} chars")),
            dim(&format!("{:.1}s", self.chunk_elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, index: usize, total: usize, error: String) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error
        };
        self.bar.println(format!(
            "  {} Chunk {:>2}/{:<2}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{:.1}s", self.chunk_elapsed_secs())),
        ));
        self.bar.finish_and_clear();
    }

    fn on_generation_complete(&self, total_chunks: usize) {
        self.bar.finish_and_clear();
        if self.errors.load(Ordering::SeqCst) == 0 {
            eprintln!(
                "{} cards generated from {} chunk(s)",
                green("✔"),
                bold(&total_chunks.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Cards for a local paper (stdout)
  pdf2cards card paper.pdf

  # From a URL, written to a file
  pdf2cards card https://arxiv.org/pdf/1706.03762 -o attention.json

  # Full output with per-chunk timings
  pdf2cards card --json-full paper.pdf

  # Use the cloud extraction service and Groq
  pdf2cards card --extractor pdf-services --provider groq --model llama3-8b-8192 paper.pdf

  # HTTP service
  pdf2cards serve --addr 0.0.0.0:8000
  curl -F file=@paper.pdf http://localhost:8000/cards

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY              OpenAI API key
  ANTHROPIC_API_KEY           Anthropic API key
  GROQ_API_KEY                Groq API key
  EDGEQUAKE_LLM_PROVIDER      Override provider (openai, anthropic, groq, ollama, …)
  EDGEQUAKE_MODEL             Override model ID
  PDFIUM_LIB_PATH             Path to a libpdfium shared library
  PDF_SERVICES_CLIENT_ID      Cloud extraction client id
  PDF_SERVICES_CLIENT_SECRET  Cloud extraction client secret

  A `.env` file in the working directory is loaded first.
"#;

/// Turn research-paper PDFs into social-media cards.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2cards",
    version,
    about = "Turn research-paper PDFs into social-media card summaries using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2CARDS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2CARDS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate cards for one PDF file or URL.
    Card(CardArgs),
    /// Serve the HTTP API.
    #[cfg(feature = "server")]
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct CardArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the JSON to this file instead of stdout.
    #[arg(short, long, env = "PDF2CARDS_OUTPUT")]
    output: Option<PathBuf>,

    /// Output the full result (cards, chunks, stats) instead of the cards only.
    #[arg(long, env = "PDF2CARDS_JSON_FULL")]
    json_full: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2CARDS_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    generation: GenerationArgs,
}

#[cfg(feature = "server")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "PDF2CARDS_ADDR", default_value = "127.0.0.1:8000")]
    addr: std::net::SocketAddr,

    #[command(flatten)]
    generation: GenerationArgs,
}

/// Flags shared by every subcommand that runs the pipeline.
#[derive(Args, Debug)]
struct GenerationArgs {
    /// LLM model ID (e.g. gpt-4.1-nano, llama3-8b-8192).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, groq, ollama, …
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Card layout: hook (default) or intro.
    #[arg(long, env = "PDF2CARDS_SCHEMA", value_enum, default_value = "hook")]
    schema: SchemaArg,

    /// Text extraction backend.
    #[arg(long, env = "PDF2CARDS_EXTRACTOR", value_enum, default_value = "pdfium")]
    extractor: ExtractorArg,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2CARDS_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a prompt template ({fields}, {paper_text}).
    #[arg(long, env = "PDF2CARDS_PROMPT_TEMPLATE")]
    prompt_template: Option<PathBuf>,

    /// Max LLM output tokens per prompt.
    #[arg(long, env = "PDF2CARDS_MAX_TOKENS", default_value_t = 8000)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2CARDS_TEMPERATURE", default_value_t = 1.0)]
    temperature: f32,

    /// Disable streamed completions.
    #[arg(long, env = "PDF2CARDS_NO_STREAM")]
    no_stream: bool,

    /// Cleaned-text length above which the text is split.
    #[arg(long, env = "PDF2CARDS_CHUNK_THRESHOLD", default_value_t = 40_000)]
    chunk_threshold: usize,

    /// Characters per chunk.
    #[arg(long, env = "PDF2CARDS_CHUNK_WIDTH", default_value_t = 40_000)]
    chunk_width: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2CARDS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-prompt LLM call timeout in seconds (none by default).
    #[arg(long, env = "PDF2CARDS_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Maximum wait for a cloud extraction job, in seconds.
    #[arg(long, env = "PDF2CARDS_POLL_TIMEOUT", default_value_t = 300)]
    poll_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum SchemaArg {
    Hook,
    Intro,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ExtractorArg {
    Pdfium,
    PdfServices,
}

impl From<ExtractorArg> for ExtractorBackend {
    fn from(v: ExtractorArg) -> Self {
        match v {
            ExtractorArg::Pdfium => ExtractorBackend::Pdfium,
            ExtractorArg::PdfServices => ExtractorBackend::PdfServices,
        }
    }
}

fn main() -> Result<()> {
    // Before clap parses, so `.env` values feed the `env = ...` flags.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for `card`; `serve` keeps them.
    let show_progress = match cli.command {
        Command::Card(ref args) => !cli.quiet && !args.no_progress,
        #[cfg(feature = "server")]
        Command::Serve(_) => false,
    };
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

    match cli.command {
        Command::Card(args) => run_card(args, show_progress, cli.quiet).await,
        #[cfg(feature = "server")]
        Command::Serve(args) => run_serve(args).await,
    }
}

async fn run_card(args: CardArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn CardProgressCallback>)
    } else {
        None
    };
    let config = build_config(&args.generation, progress_cb).await?;
    let source = DocumentSource::from_input(&args.input).context("Invalid input")?;

    let output = generate(source, &config)
        .await
        .context("Card generation failed")?;

    let json = if args.json_full {
        serde_json::to_string_pretty(&output).context("Failed to serialise output")?
    } else {
        output.cards.to_pretty_json()
    };

    match args.output {
        Some(ref path) => {
            write_atomic(path, &json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !quiet {
                eprintln!(
                    "{}  {} chunk(s)  {}ms  →  {}",
                    green("✔"),
                    output.stats.chunk_count,
                    output.stats.total_ms,
                    bold(&path.display().to_string()),
                );
            }
        }
        None => println!("{json}"),
    }

    if !quiet && !show_progress {
        eprintln!(
            "Generated cards from {} chars in {} chunk(s), {}ms",
            output.stats.cleaned_chars, output.stats.chunk_count, output.stats.total_ms
        );
    }
    Ok(())
}

#[cfg(feature = "server")]
async fn run_serve(args: ServeArgs) -> Result<()> {
    use pdf2cards::server::{serve, AppState};
    use pdf2cards::{completion_from_config, extractor_from_config};

    let config = build_config(&args.generation, None).await?;
    let extractor =
        extractor_from_config(&config).context("Failed to set up text extraction")?;
    let completion = completion_from_config(&config)
        .await
        .context("Failed to set up LLM provider")?;

    eprintln!(
        "{} {}",
        cyan("◆"),
        bold(&format!("Serving on http://{}", args.addr))
    );
    serve(args.addr, AppState::new(extractor, completion, config))
        .await
        .context("Server failed")
}

/// Map CLI args to `CardConfig`.
async fn build_config(
    args: &GenerationArgs,
    progress: Option<ProgressCallback>,
) -> Result<CardConfig> {
    let schema = match args.schema {
        SchemaArg::Hook => CardSchema::hook(),
        SchemaArg::Intro => CardSchema::intro(),
    };

    let mut builder = CardConfig::builder()
        .schema(schema)
        .extractor(args.extractor.clone().into())
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .stream(!args.no_stream)
        .chunk_threshold(args.chunk_threshold)
        .chunk_width(args.chunk_width)
        .download_timeout_secs(args.download_timeout)
        .poll_timeout_secs(args.poll_timeout);

    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = args.password {
        builder = builder.password(password);
    }
    if let Some(secs) = args.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref path) = args.prompt_template {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.prompt_template(template);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
