//! CLI binary for img2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to `JobConfig`,
//! drives a `PipelineManager`, and renders progress.

use anyhow::{bail, Context, Result};
use clap::Parser;
use img2pdf::pipeline::input::load_image_files;
use img2pdf::{
    Img2PdfError, JobConfig, JobOutput, Margins, PageSizeMode, PipelineManager, StandardDownload,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # One page per image, A4, no margins
  img2pdf scan1.png scan2.jpg -o scans.pdf

  # Pages sized to the images themselves, 10 mm margins
  img2pdf --page-size original-size --margin 10 photos/*.jpg -o album.pdf

  # Smaller output, stamped page numbers
  img2pdf --quality 0.7 --page-numbers *.png -o notes.pdf

  # Machine-readable stats
  img2pdf --json report/*.png -o report.pdf

NOTES:
  Every image is flattened onto a white background and re-encoded as JPEG
  at the configured quality; transparency never renders black. A corrupt
  input is skipped with a warning — the remaining images still convert.
"#;

/// Convert images into a paginated PDF document.
#[derive(Parser, Debug)]
#[command(
    name = "img2pdf",
    version,
    about = "Convert images into a paginated PDF document",
    long_about = "Convert images (PNG, JPEG, WebP, GIF, BMP) into a single PDF with one page \
per image. Page sizing, margins, and JPEG quality are configurable; corrupt inputs are \
skipped rather than failing the whole document.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files, in page order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output PDF path.
    #[arg(short, long, env = "IMG2PDF_OUTPUT", default_value = "output.pdf")]
    output: PathBuf,

    /// Page sizing: a4, original-size, fit-screen.
    #[arg(long, env = "IMG2PDF_PAGE_SIZE", value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// Uniform page margin in millimetres.
    #[arg(long, env = "IMG2PDF_MARGIN", default_value_t = 0.0)]
    margin: f64,

    /// Top margin in millimetres (overrides --margin).
    #[arg(long)]
    margin_top: Option<f64>,

    /// Right margin in millimetres (overrides --margin).
    #[arg(long)]
    margin_right: Option<f64>,

    /// Bottom margin in millimetres (overrides --margin).
    #[arg(long)]
    margin_bottom: Option<f64>,

    /// Left margin in millimetres (overrides --margin).
    #[arg(long)]
    margin_left: Option<f64>,

    /// JPEG re-encode quality (0.0–1.0).
    #[arg(long, env = "IMG2PDF_QUALITY", default_value_t = 0.92)]
    quality: f32,

    /// Stamp an "i/N" page label on every page.
    #[arg(long, env = "IMG2PDF_PAGE_NUMBERS")]
    page_numbers: bool,

    /// Print job statistics as JSON to stdout.
    #[arg(long, env = "IMG2PDF_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "IMG2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PageSizeArg {
    A4,
    OriginalSize,
    FitScreen,
}

impl From<PageSizeArg> for PageSizeMode {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSizeMode::A4,
            PageSizeArg::OriginalSize => PageSizeMode::OriginalSize,
            PageSizeArg::FitScreen => PageSizeMode::FitScreen,
        }
    }
}

/// Terminal outcome relayed from the manager's callbacks.
enum Outcome {
    Complete(Box<JobOutput>),
    Cancelled,
    Error(Img2PdfError),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs would fight the progress bar for the
    // terminal; keep them quiet unless the user asked for detail.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let file_name = cli
        .output
        .file_name()
        .context("output path has no file name")?
        .to_string_lossy()
        .into_owned();
    let out_dir = cli
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let margins = Margins {
        top: cli.margin_top.unwrap_or(cli.margin),
        right: cli.margin_right.unwrap_or(cli.margin),
        bottom: cli.margin_bottom.unwrap_or(cli.margin),
        left: cli.margin_left.unwrap_or(cli.margin),
    };
    let config = JobConfig::builder()
        .page_size(cli.page_size.clone().into())
        .margins(margins)
        .jpeg_quality(cli.quality)
        .file_name(file_name.as_str())
        .page_numbers(cli.page_numbers)
        .build()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    // ── Load inputs ──────────────────────────────────────────────────────
    let files = load_image_files(&cli.inputs)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let total = files.len();

    // ── Progress bar ─────────────────────────────────────────────────────
    let bar = if show_progress {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} images  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Converting");
        Some(bar)
    } else {
        None
    };

    // ── Run the pipeline ─────────────────────────────────────────────────
    let manager = PipelineManager::new(Arc::new(StandardDownload::new(out_dir)));
    let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();

    if let Some(bar) = bar.clone() {
        manager.on_progress(move |p| {
            bar.set_position(p.current as u64 - 1);
            bar.set_message(p.message);
        });
    }
    let tx = done_tx.clone();
    manager.on_complete(move |output| {
        let _ = tx.send(Outcome::Complete(Box::new(output)));
    });
    let tx = done_tx.clone();
    manager.on_error(move |e| {
        let _ = tx.send(Outcome::Error(e));
    });
    let tx = done_tx;
    manager.on_cancel(move || {
        let _ = tx.send(Outcome::Cancelled);
    });

    manager
        .start(files, config)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    // Ctrl-C requests cooperative cancellation; the job ends at the next
    // image boundary with a proper `cancelled` outcome.
    let cancel_manager = manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling…");
            cancel_manager.cancel();
        }
    });

    let outcome = done_rx
        .recv()
        .await
        .context("pipeline ended without a terminal event")?;

    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    match outcome {
        Outcome::Complete(output) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output.stats)?);
            } else if !cli.quiet {
                eprintln!(
                    "✔ {} — {} pages, {} KiB ({} of {} images, {}ms)",
                    output.delivered.path().display(),
                    output.stats.page_count,
                    output.stats.pdf_bytes / 1024,
                    output.stats.processed_images,
                    output.stats.total_images,
                    output.stats.total_duration_ms,
                );
                for fault in &output.faults {
                    eprintln!("  ⚠ skipped: {fault}");
                }
            }
            Ok(())
        }
        Outcome::Cancelled => {
            if !cli.quiet {
                eprintln!("✘ cancelled — no document was produced");
            }
            std::process::exit(130);
        }
        Outcome::Error(e) => bail!("conversion failed: {e}"),
    }
}
