//! Result types returned by an extraction run.

use crate::pipeline::crop::CropRect;
use crate::pipeline::detect::DetectionBox;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// One entry per written file, in write order.
    pub faces: Vec<SavedFace>,
    /// Metadata of the source document.
    pub metadata: DocumentMetadata,
    /// Counters and timings.
    pub stats: ExtractionStats,
}

/// A face image written to the output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFace {
    /// Run-scoped sequence number; the `n` in `face_<n>.jpg`. Starts at 1.
    pub index: usize,
    /// File name relative to the output directory.
    pub file_name: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// 1-indexed page the face was found on.
    pub page_num: usize,
    /// Raw detector box in page-bitmap pixels.
    pub detection: DetectionBox,
    /// Margin-expanded, bounds-clipped region that was written.
    pub crop: CropRect,
}

/// Counters and timings for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages that were rasterised and scanned.
    pub processed_pages: usize,
    /// Face images written.
    pub total_faces: usize,
    /// Wall-clock time of the whole run.
    pub total_duration_ms: u64,
    /// Time spent rasterising and colour-normalising pages.
    pub render_duration_ms: u64,
    /// Time spent in the face detector.
    pub detect_duration_ms: u64,
}

/// Document-level information read without rendering any page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
