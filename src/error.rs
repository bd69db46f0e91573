//! Error type for the pdf-face-extract library.
//!
//! Every failure is fatal: the extraction run has no per-page or per-face
//! isolation, so a single [`FaceExtractError`] is returned from the top-level
//! `extract*` functions and the run stops where it failed. Face images that
//! were already written stay on disk.
//!
//! Variants carry the path or page number they refer to so the CLI can print
//! an actionable message without extra bookkeeping.

use crate::pipeline::detect::DetectionBox;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-face-extract library.
#[derive(Debug, Error)]
pub enum FaceExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// A page index past the end of the document was requested.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A rendered page has a channel layout other than RGB or RGBA.
    #[error("Page {page} has {channels} colour channel(s); only RGB (3) and RGBA (4) are supported")]
    UnsupportedFormat { page: usize, channels: u8 },

    // ── Detector errors ───────────────────────────────────────────────────
    /// No cascade file was given and none was found in the usual places.
    #[error(
        "Face cascade not found{}\n\
Pass --cascade /path/to/haarcascade_frontalface_default.xml or set PDF_FACES_CASCADE.\n\
The file ships with OpenCV (share/opencv4/haarcascades/).",
        .path.as_ref().map(|p| format!(": '{}'", p.display())).unwrap_or_default()
    )]
    CascadeNotFound { path: Option<PathBuf> },

    /// The cascade file could not be parsed or uses an unsupported layout.
    #[error("Invalid cascade '{path}': {detail}")]
    CascadeFormat { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write a face image.
    #[error("Failed to write face image '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JPEG encoding of a crop failed.
    #[error("Failed to encode '{path}': {detail}")]
    EncodeFailed { path: PathBuf, detail: String },

    /// A detection clipped to the page produced an empty rectangle.
    #[error("Detection {detection:?} on page {page} lies outside the {width}x{height} page bitmap")]
    EmptyCrop {
        page: usize,
        detection: DetectionBox,
        width: u32,
        height: u32,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
pdf-faces needs the PDFium shared library at runtime. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Place libpdfium next to the binary or in the working directory.\n\
  • Install it system-wide (pre-built: https://github.com/bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
