//! Progress-callback trait for per-page and per-face extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks the document. The CLI uses this to print one
//! line per saved face; library callers can forward events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use pdf_face_extract::{ExtractionConfig, ExtractionProgressCallback, SavedFace};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     saved: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_face_saved(&self, face: &SavedFace) {
//!         self.saved.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} (page {})", face.file_name, face.page_num);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { saved: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::SavedFace;
use std::sync::Arc;

/// Called by the extraction pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in document order from the thread
/// running the extraction; the `Send + Sync` bound only lets a callback be
/// shared with other parts of the host application.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after the document is opened, before any page is rendered.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be scanned
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is rasterised.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a face image has been written to disk.
    fn on_face_saved(&self, face: &SavedFace) {
        let _ = face;
    }

    /// Called once all detections on a page have been written.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    /// * `faces`       — faces saved from this page
    fn on_page_complete(&self, page_num: usize, total_pages: usize, faces: usize) {
        let _ = (page_num, total_pages, faces);
    }

    /// Called once after every selected page has been scanned.
    ///
    /// # Arguments
    /// * `total_pages` — pages scanned
    /// * `total_faces` — face images written during the run
    fn on_extraction_complete(&self, total_pages: usize, total_faces: usize) {
        let _ = (total_pages, total_faces);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
