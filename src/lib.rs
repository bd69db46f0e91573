//! # pdf-face-extract
//!
//! Extract face images from the pages of a PDF document.
//!
//! Each page is rasterised at 3× zoom, normalised to a BGR buffer, and scanned
//! by a classical Haar cascade frontal-face detector. Every detection is
//! expanded by a 20 % margin, clipped to the page, and written as
//! `face_<n>.jpg` with a single counter spanning the whole document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    check the file exists and starts with %PDF
//!  ├─ 2. Render   rasterise one page at a time via pdfium (3× zoom)
//!  ├─ 3. Color    RGB/RGBA → BGR, then luma for the detector
//!  ├─ 4. Detect   multi-scale Haar cascade + rectangle grouping
//!  └─ 5. Crop     margin, clip, JPEG-encode, atomic write
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_face_extract::{extract_faces, ExtractionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The cascade is searched in the usual OpenCV install locations
//!     // unless `cascade_path` is set.
//!     let config = ExtractionConfig::builder().output_dir("extracted_faces").build()?;
//!     let output = extract_faces("document.pdf", &config)?;
//!     for face in &output.faces {
//!         println!("Saved: {} (page {})", face.file_name, face.page_num);
//!     }
//!     println!("Extracted {} face image(s) in total.", output.stats.total_faces);
//!     Ok(())
//! }
//! ```
//!
//! ## Runtime requirements
//!
//! * A PDFium shared library (see [`engine`] for the lookup order).
//! * An OpenCV Haar cascade XML such as `haarcascade_frontalface_default.xml`.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-faces` binary (clap + anyhow + tracing-subscriber + indicatif + serde_json) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-face-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cascade;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cascade::{locate_cascade, HaarCascade, DEFAULT_CASCADE_FILE};
pub use config::{DetectorConfig, ExtractionConfig, ExtractionConfigBuilder, PageSelection};
pub use error::FaceExtractError;
pub use extract::{extract_faces, extract_faces_with, inspect, run_pipeline};
pub use output::{DocumentMetadata, ExtractionOutput, ExtractionStats, SavedFace};
pub use pipeline::color::PageBitmap;
pub use pipeline::crop::CropRect;
pub use pipeline::detect::{CascadeDetector, DetectionBox, FaceDetector};
pub use pipeline::render::{BitmapPageSource, PageSource, PdfPageSource};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
