//! CLI binary for edgequake-ocr.
//!
//! A thin shim over the library crate: maps CLI flags to
//! `ExtractionOverrides`, picks a document store, runs one extraction and
//! prints the text.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_ocr::{
    DocumentStore, ExtractionOverrides, FsStore, ImageFormat, OcrExtractor, OcrSettings,
    PageRenderer, PaperlessStore, Pdftoppm,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR a file from a local directory
  dococr --root ./inbox scan.pdf

  # OCR a Paperless-ngx document, first 3 pages, as JPEG
  dococr --paperless-url http://paperless:8000 --paperless-token $TOKEN \
         --max-pages 3 --image-format jpeg 42

  # JSON output (text + per-page annotations)
  dococr --root ./inbox --json photo.jpg > photo.json

ENVIRONMENT VARIABLES:
  OCR_ENABLED             Must be yes/true/1/on for anything to run
  OCR_SERVICE_URL         Base URL of the OCR service (POST {url}/ocr)
  OCR_MAX_PAGES           Configured page cap            (default 50)
  OCR_IMAGE_FORMAT        png | jpeg                     (default png)
  OCR_DPI                 Rendering resolution           (default 150)
  OCR_PROMPT              Instruction sent with images   (default "Convert to markdown.")
  OCR_MAX_NEW_TOKENS      Generation budget              (default 4096)
  OCR_TIMEOUT_MS          Service call budget            (default 120000)
  OCR_MAX_CHARS           Returned text cap              (default 50000)
  VISION_MAX_PAGES / VISION_IMAGE_FORMAT / VISION_DPI
                          Renderer fallbacks for direct renderer use
  OCR_PDFTOPPM            pdftoppm binary                (default: pdftoppm on PATH)

  Variables are also read from a .env file in the working directory.
  Flags below override the OCR_* values for a single run.
"#;

/// Extract text from stored documents with an OCR vision service.
#[derive(Parser, Debug)]
#[command(
    name = "dococr",
    version,
    about = "Extract text from stored documents with an OCR vision service",
    long_about = "Render a document (PDF or image) to page images and send them to an OCR \
vision service in a single request. Documents come from a local directory (--root) or a \
Paperless-ngx instance (--paperless-url).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document id: a file name under --root, or a Paperless document id.
    document_id: String,

    /// Read documents from this directory.
    #[arg(long, env = "DOCOCR_ROOT", conflicts_with = "paperless_url")]
    root: Option<PathBuf>,

    /// Read documents from this Paperless-ngx instance.
    #[arg(long, env = "PAPERLESS_URL")]
    paperless_url: Option<String>,

    /// Paperless API token.
    #[arg(long, env = "PAPERLESS_TOKEN", hide_env_values = true)]
    paperless_token: Option<String>,

    /// pdftoppm binary used to rasterise PDFs.
    #[arg(long, env = "OCR_PDFTOPPM", default_value = "pdftoppm")]
    pdftoppm: PathBuf,

    /// Last page to render.
    #[arg(long)]
    max_pages: Option<u32>,

    /// Page image format: png or jpeg.
    #[arg(long)]
    image_format: Option<String>,

    /// Rendering DPI.
    #[arg(long)]
    dpi: Option<u32>,

    /// Instruction sent alongside the images.
    #[arg(long)]
    prompt: Option<String>,

    /// Generation budget for the OCR model.
    #[arg(long)]
    max_new_tokens: Option<u32>,

    /// Abort the service call after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Cap the returned text at this many characters.
    #[arg(long)]
    max_chars: Option<usize>,

    /// Print `{ "text", "pages" }` as JSON instead of plain text.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCOCR_VERBOSE")]
    verbose: bool,

    /// Suppress everything except the extracted text.
    #[arg(short, long, env = "DOCOCR_QUIET")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> ExtractionOverrides {
        ExtractionOverrides {
            max_pages: self.max_pages,
            image_format: self.image_format.as_deref().map(ImageFormat::parse_lenient),
            dpi: self.dpi,
            prompt: self.prompt.clone(),
            max_new_tokens: self.max_new_tokens,
            timeout_ms: self.timeout_ms,
            max_chars: self.max_chars,
        }
    }

    fn store(&self) -> Result<Arc<dyn DocumentStore>> {
        if let Some(ref root) = self.root {
            return Ok(Arc::new(FsStore::new(root)));
        }
        if let Some(ref url) = self.paperless_url {
            let mut store = PaperlessStore::new(url);
            if let Some(ref token) = self.paperless_token {
                store = store.token(token);
            }
            return Ok(Arc::new(store));
        }
        anyhow::bail!("No document store: pass --root <DIR> or --paperless-url <URL>")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build extractor ──────────────────────────────────────────────────
    let settings = OcrSettings::from_env().context("Invalid OCR configuration")?;
    if !settings.enabled && !cli.quiet {
        eprintln!(
            "{} OCR is disabled (set OCR_ENABLED=yes); the result will be empty",
            yellow("⚠")
        );
    }

    let store = cli.store()?;
    let renderer = PageRenderer::new(Arc::clone(&store))
        .defaults(settings.vision)
        .rasterizer(Arc::new(Pdftoppm::new(&cli.pdftoppm)));
    let extractor = OcrExtractor::new(settings, store).renderer(renderer);

    // ── Run extraction ───────────────────────────────────────────────────
    let spinner = (!cli.quiet && !cli.json).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(format!("Extracting {}…", cli.document_id));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let start = Instant::now();
    let result = extractor
        .extract_document_text(&cli.document_id, &cli.overrides())
        .await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(result.text.as_bytes())
        .context("Failed to write to stdout")?;
    if !result.text.is_empty() && !result.text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }

    if !cli.quiet {
        if result.text.is_empty() {
            eprintln!("{} No text extracted {}", yellow("⚠"), dim("(run with -v for details)"));
        } else {
            eprintln!(
                "{} {} chars, {} page annotations  {}",
                green("✔"),
                result.text.chars().count(),
                result.pages.len(),
                dim(&format!("{}ms", start.elapsed().as_millis())),
            );
        }
    }

    Ok(())
}
