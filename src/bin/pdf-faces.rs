//! CLI binary for pdf-face-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_face_extract::{
    extract_faces, inspect, DetectorConfig, ExtractionConfig, ExtractionProgressCallback,
    PageSelection, ProgressCallback, SavedFace,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

// ── CLI progress callback ────────────────────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Style shared by the opening spinner and the page bar.
fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
}

/// Prints one `Saved:` line per face on stdout and, when enabled, keeps an
/// [indicatif] page bar on stderr.
struct CliProgressCallback {
    bar: Option<ProgressBar>,
}

impl CliProgressCallback {
    fn new(show_bar: bool) -> Arc<Self> {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(0);
            bar.set_style(bar_style("{spinner:.cyan} {prefix:.bold}  {msg}"));
            bar.set_prefix("Preparing");
            bar.set_message("Opening PDF…");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Arc::new(Self { bar })
    }

    /// Print to stdout without tearing the bar.
    fn line(&self, text: String) {
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{text}")),
            None => println!("{text}"),
        }
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        let Some(bar) = &self.bar else { return };
        bar.set_length(total_pages as u64);
        bar.set_style(bar_style(
            "{spinner:.cyan} {prefix:.bold}  [{bar:36.green/238}] {pos}/{len} pages  {msg}",
        ));
        bar.set_prefix("Scanning");
        bar.set_message("");
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("page {page_num}"));
        }
    }

    fn on_face_saved(&self, face: &SavedFace) {
        self.line(format!("Saved: {} (page {})", face.file_name, face.page_num));
    }

    fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _faces: usize) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_extraction_complete(&self, total_pages: usize, total_faces: usize) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
            eprintln!(
                "{} {} page(s) scanned, {} face(s) found",
                green("✔"),
                bold(&total_pages.to_string()),
                bold(&total_faces.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract faces into ./extracted_faces
  pdf-faces document.pdf

  # Custom output directory and cascade file
  pdf-faces document.pdf -o faces --cascade haarcascade_frontalface_default.xml

  # Only pages 2-4, looser detector
  pdf-faces --pages 2-4 --min-neighbors 3 --min-size 60 scan.pdf

  # Inspect PDF metadata (no cascade needed)
  pdf-faces --inspect-only document.pdf

  # JSON report of every saved face
  pdf-faces --json document.pdf > faces.json

ENVIRONMENT VARIABLES:
  PDF_FACES_CASCADE   Path to the Haar cascade XML
  PDF_FACES_OUTPUT    Output directory
  PDFIUM_LIB_PATH     Path to libpdfium (file or directory)
  RUST_LOG            Log filter, e.g. pdf_face_extract=debug

SETUP:
  The cascade ships with OpenCV as
  share/opencv4/haarcascades/haarcascade_frontalface_default.xml and is found
  automatically in the usual install locations or the current directory.
  PDFium must be installed as a shared library (libpdfium.so / .dylib / .dll).
"#;

/// Extract face images from the pages of a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-faces",
    version,
    about = "Extract face images from the pages of a PDF",
    long_about = "Rasterise every page of a PDF at 3x zoom, detect frontal faces with a \
Haar cascade, and save each face (with a 20% margin) as face_<n>.jpg.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Directory that receives face_<n>.jpg (created if missing).
    #[arg(short, long, env = "PDF_FACES_OUTPUT", default_value = "extracted_faces")]
    output_dir: PathBuf,

    /// Haar cascade XML (default: search the OpenCV install locations).
    #[arg(long, env = "PDF_FACES_CASCADE")]
    cascade: Option<PathBuf>,

    /// Detection window growth per scale step (> 1.0).
    #[arg(long, env = "PDF_FACES_SCALE_FACTOR", default_value_t = 1.1)]
    scale_factor: f64,

    /// Overlapping hits a face needs beyond the first.
    #[arg(long, env = "PDF_FACES_MIN_NEIGHBORS", default_value_t = 5)]
    min_neighbors: u32,

    /// Smallest face to report: N or WxH pixels at 3x zoom.
    #[arg(long, env = "PDF_FACES_MIN_SIZE", default_value = "100")]
    min_size: String,

    /// Largest face to report: N or WxH pixels at 3x zoom.
    #[arg(long, env = "PDF_FACES_MAX_SIZE")]
    max_size: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF_FACES_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_FACES_PASSWORD")]
    password: Option<String>,

    /// Output structured JSON (ExtractionOutput) instead of text lines.
    #[arg(long, env = "PDF_FACES_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_FACES_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_FACES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_FACES_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs duplicate the progress bar and the Saved: lines.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if cli.quiet || cli.json {
        None
    } else {
        let cb = CliProgressCallback::new(show_progress);
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract_faces(&cli.input, &config).context("Face extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        println!(
            "Extracted {} face image(s) in total.",
            output.stats.total_faces
        );
        eprintln!(
            "{} {}  {}",
            cyan("→"),
            bold(&config.output_dir.display().to_string()),
            dim(&format!("{}ms", output.stats.total_duration_ms)),
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let (min_w, min_h) = parse_size(&cli.min_size).context("Invalid --min-size")?;
    let max_size = cli
        .max_size
        .as_deref()
        .map(parse_size)
        .transpose()
        .context("Invalid --max-size")?;

    let mut builder = ExtractionConfig::builder()
        .output_dir(&cli.output_dir)
        .detector(DetectorConfig {
            scale_factor: cli.scale_factor,
            min_neighbors: cli.min_neighbors,
            min_size: (min_w, min_h),
            max_size,
        })
        .pages(parse_pages(&cli.pages)?);

    if let Some(ref cascade) = cli.cascade {
        builder = builder.cascade_path(cascade);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `N` or `WxH` into `(width, height)`.
fn parse_size(s: &str) -> Result<(u32, u32)> {
    let s = s.trim().to_lowercase();
    match s.split_once('x') {
        Some((w, h)) => Ok((
            w.trim().parse().context("Invalid width")?,
            h.trim().parse().context("Invalid height")?,
        )),
        None => {
            let n = s.parse().context("Invalid size")?;
            Ok((n, n))
        }
    }
}

/// One 1-based page number.
fn page_number(s: &str) -> Result<usize> {
    let s = s.trim();
    let page: usize = s
        .parse()
        .with_context(|| format!("Invalid page number '{s}'"))?;
    anyhow::ensure!(page >= 1, "Pages start at 1 (got {page})");
    Ok(page)
}

/// Parse `--pages`: `all`, `5`, `3-15` or `1,3,5`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("all") {
        return Ok(PageSelection::All);
    }
    if let Some((start, end)) = s.split_once('-') {
        let (start, end) = (page_number(start)?, page_number(end)?);
        anyhow::ensure!(start <= end, "Page range {start}-{end} runs backwards");
        return Ok(PageSelection::Range(start, end));
    }
    if s.contains(',') {
        let pages = s.split(',').map(page_number).collect::<Result<Vec<_>>>()?;
        return Ok(PageSelection::Set(pages));
    }
    page_number(s).map(PageSelection::Single)
}
