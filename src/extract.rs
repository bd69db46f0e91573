//! Top-level extraction entry points.
//!
//! [`extract_faces`] is the one-call API: it locates and loads the cascade,
//! binds pdfium, opens the document and runs the pipeline.
//! [`extract_faces_with`] does the same with a caller-supplied detector, and
//! [`run_pipeline`] drives any [`PageSource`] without touching pdfium at all.
//!
//! Every stage error is fatal and propagates with `?`. Face images written
//! before the failure stay on disk.

use crate::cascade::locate_cascade;
use crate::config::{ExtractionConfig, PageSelection};
use crate::engine::bind_pdfium;
use crate::error::FaceExtractError;
use crate::output::{DocumentMetadata, ExtractionOutput, ExtractionStats};
use crate::pipeline::color::normalize;
use crate::pipeline::crop::{ensure_output_dir, FaceWriter};
use crate::pipeline::detect::{CascadeDetector, FaceDetector};
use crate::pipeline::input::resolve_local;
use crate::pipeline::render::{PageSource, PdfPageSource};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Extract every detected face in a PDF into `config.output_dir`.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns the first failure: missing or invalid input, missing cascade,
/// pdfium binding, unreadable pages, unsupported bitmap layouts, or a failed
/// write.
///
/// # Example
/// ```rust,no_run
/// use pdf_face_extract::{extract_faces, ExtractionConfig};
///
/// let config = ExtractionConfig::builder()
///     .output_dir("faces")
///     .cascade_path("haarcascade_frontalface_default.xml")
///     .build()?;
/// let output = extract_faces("document.pdf", &config)?;
/// println!("Extracted {} face image(s) in total.", output.stats.total_faces);
/// # Ok::<(), pdf_face_extract::FaceExtractError>(())
/// ```
pub fn extract_faces(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, FaceExtractError> {
    ensure_output_dir(&config.output_dir)?;

    let cascade_path = locate_cascade(config.cascade_path.as_deref())?;
    let detector = CascadeDetector::from_file(&cascade_path, config.detector)?;
    info!("Using cascade {}", cascade_path.display());

    extract_faces_with(input, config, &detector)
}

/// Like [`extract_faces`], with a caller-supplied detector.
pub fn extract_faces_with(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
    detector: &dyn FaceDetector,
) -> Result<ExtractionOutput, FaceExtractError> {
    let input = input.as_ref();
    info!("Starting extraction: {}", input.display());

    ensure_output_dir(&config.output_dir)?;
    let pdf_path = resolve_local(input)?;

    let pdfium = bind_pdfium()?;
    let source = PdfPageSource::open(&pdfium, &pdf_path, config.password.as_deref())?;

    let mut output = run_pipeline(&source, detector, config)?;
    output.metadata = source.metadata();
    Ok(output)
}

/// Scan the selected pages of `source` and write every detection.
///
/// The face counter is local to this call: files are numbered `face_1.jpg`,
/// `face_2.jpg`, … across all pages with no gaps. `metadata` in the result
/// only carries the page count; [`extract_faces_with`] fills in the rest.
pub fn run_pipeline(
    source: &dyn PageSource,
    detector: &dyn FaceDetector,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, FaceExtractError> {
    let total_start = Instant::now();
    let mut writer = FaceWriter::create(&config.output_dir)?;

    let total_pages = source.page_count();
    let page_indices = config.pages.to_indices(total_pages);
    if total_pages > 0 && page_indices.is_empty() {
        return Err(FaceExtractError::PageOutOfRange {
            page: first_requested_page(&config.pages),
            total: total_pages,
        });
    }
    let selected = page_indices.len();
    info!("Scanning {} of {} page(s)", selected, total_pages);

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(selected);
    }

    let mut faces = Vec::new();
    let mut render_duration_ms = 0u64;
    let mut detect_duration_ms = 0u64;

    for &idx in &page_indices {
        let page_num = idx + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, selected);
        }

        let render_start = Instant::now();
        let bitmap = source.rasterize(idx)?;
        let page = normalize(&bitmap, page_num)?;
        render_duration_ms += render_start.elapsed().as_millis() as u64;

        let detect_start = Instant::now();
        let detections = detector.detect(&page.to_gray());
        detect_duration_ms += detect_start.elapsed().as_millis() as u64;
        debug!(
            "Page {}: {}x{} px, {} detection(s)",
            page_num,
            page.width(),
            page.height(),
            detections.len()
        );

        let before = faces.len();
        for detection in &detections {
            let saved = writer.save(&page, detection, page_num)?;
            if let Some(ref cb) = config.progress_callback {
                cb.on_face_saved(&saved);
            }
            faces.push(saved);
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page_num, selected, faces.len() - before);
        }
    }

    let stats = ExtractionStats {
        total_pages,
        processed_pages: selected,
        total_faces: faces.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        detect_duration_ms,
    };

    info!(
        "Extraction complete: {} face image(s) from {} page(s), {}ms total",
        stats.total_faces, selected, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(selected, faces.len());
    }

    Ok(ExtractionOutput {
        faces,
        metadata: DocumentMetadata {
            page_count: total_pages,
            ..DocumentMetadata::default()
        },
        stats,
    })
}

/// Read PDF metadata without rendering any page.
///
/// Needs a pdfium library but no cascade.
pub fn inspect(input: impl AsRef<Path>) -> Result<DocumentMetadata, FaceExtractError> {
    let pdf_path = resolve_local(input.as_ref())?;
    let pdfium = bind_pdfium()?;
    let source = PdfPageSource::open(&pdfium, &pdf_path, None)?;
    Ok(source.metadata())
}

/// 1-indexed page to report when a selection matches nothing.
fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}
