//! Configuration types for face extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The detector's tunables live in their
//! own [`DetectorConfig`] so a different detection backend can be configured
//! (or swapped in) without touching the pipeline's control flow.

use crate::error::FaceExtractError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Directory used when the caller does not name one.
pub const DEFAULT_OUTPUT_DIR: &str = "extracted_faces";

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_face_extract::{DetectorConfig, ExtractionConfig};
///
/// let config = ExtractionConfig::builder()
///     .output_dir("faces")
///     .detector(DetectorConfig {
///         min_neighbors: 3,
///         ..DetectorConfig::default()
///     })
///     .build()
///     .unwrap();
/// assert_eq!(config.detector.scale_factor, 1.1);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Directory that receives `face_<n>.jpg`. Created with its parents if
    /// missing. Default: `extracted_faces`.
    pub output_dir: PathBuf,

    /// Cascade detector parameters.
    pub detector: DetectorConfig,

    /// Path to an OpenCV Haar cascade XML. If None, the well-known OpenCV
    /// install locations are searched (see [`crate::cascade::locate_cascade`]).
    pub cascade_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Receives per-page and per-face events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            detector: DetectorConfig::default(),
            cascade_path: None,
            password: None,
            pages: PageSelection::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("output_dir", &self.output_dir)
            .field("detector", &self.detector)
            .field("cascade_path", &self.cascade_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn detector(mut self, detector: DetectorConfig) -> Self {
        self.config.detector = detector;
        self
    }

    pub fn scale_factor(mut self, factor: f64) -> Self {
        self.config.detector.scale_factor = factor;
        self
    }

    pub fn min_neighbors(mut self, n: u32) -> Self {
        self.config.detector.min_neighbors = n;
        self
    }

    pub fn min_size(mut self, width: u32, height: u32) -> Self {
        self.config.detector.min_size = (width, height);
        self
    }

    pub fn max_size(mut self, width: u32, height: u32) -> Self {
        self.config.detector.max_size = Some((width, height));
        self
    }

    pub fn cascade_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cascade_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, FaceExtractError> {
        if self.config.output_dir.as_os_str().is_empty() {
            return Err(FaceExtractError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        self.config.detector.validate()?;
        Ok(self.config)
    }
}

// ── Detector parameters ──────────────────────────────────────────────────

/// Parameters of the multi-scale cascade scan.
///
/// | Field | Default | Effect |
/// |-------|---------|--------|
/// | `scale_factor` | 1.1 | window growth per pyramid step |
/// | `min_neighbors` | 5 | a cluster must hold more raw hits than this |
/// | `min_size` | 100×100 | smaller windows are never evaluated |
/// | `max_size` | none | larger windows are never evaluated |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Search-window growth per scale step. Must be greater than 1.
    pub scale_factor: f64,
    /// Overlapping raw hits a candidate needs to survive grouping.
    /// `0` disables grouping and returns every raw hit.
    pub min_neighbors: u32,
    /// Smallest `(width, height)` window, in page-bitmap pixels.
    pub min_size: (u32, u32),
    /// Largest `(width, height)` window. None means the bitmap size.
    pub max_size: Option<(u32, u32)>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: (100, 100),
            max_size: None,
        }
    }
}

impl DetectorConfig {
    /// Reject parameter combinations the scan cannot run with.
    pub fn validate(&self) -> Result<(), FaceExtractError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(FaceExtractError::InvalidConfig(format!(
                "Scale factor must be > 1.0, got {}",
                self.scale_factor
            )));
        }
        if let Some((max_w, max_h)) = self.max_size {
            let (min_w, min_h) = self.min_size;
            if max_w < min_w || max_h < min_h {
                return Err(FaceExtractError::InvalidConfig(format!(
                    "Maximum size {max_w}x{max_h} is smaller than minimum size {min_w}x{min_h}"
                )));
            }
        }
        Ok(())
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Scan all pages (default).
    #[default]
    All,
    /// Scan a single page (1-indexed).
    Single(usize),
    /// Scan a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Scan specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    ///
    /// Pages past `total_pages` are dropped silently.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_parameters() {
        let c = ExtractionConfig::default();
        assert_eq!(c.output_dir, PathBuf::from("extracted_faces"));
        assert_eq!(c.detector.scale_factor, 1.1);
        assert_eq!(c.detector.min_neighbors, 5);
        assert_eq!(c.detector.min_size, (100, 100));
        assert_eq!(c.detector.max_size, None);
        assert_eq!(c.pages, PageSelection::All);
    }

    #[test]
    fn builder_rejects_non_growing_scale() {
        for bad in [1.0, 0.9, f64::NAN, f64::INFINITY] {
            let err = ExtractionConfig::builder().scale_factor(bad).build();
            assert!(
                matches!(err, Err(FaceExtractError::InvalidConfig(_))),
                "scale {bad} should be rejected"
            );
        }
    }

    #[test]
    fn builder_rejects_inverted_size_bounds() {
        let err = ExtractionConfig::builder()
            .min_size(100, 100)
            .max_size(50, 200)
            .build();
        assert!(matches!(err, Err(FaceExtractError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_empty_output_dir() {
        let err = ExtractionConfig::builder().output_dir("").build();
        assert!(matches!(err, Err(FaceExtractError::InvalidConfig(_))));
    }

    #[test]
    fn builder_sets_fields() {
        let c = ExtractionConfig::builder()
            .output_dir("out/faces")
            .min_neighbors(3)
            .min_size(48, 64)
            .cascade_path("/tmp/cascade.xml")
            .password("secret")
            .pages(PageSelection::Range(2, 4))
            .build()
            .unwrap();
        assert_eq!(c.output_dir, PathBuf::from("out/faces"));
        assert_eq!(c.detector.min_neighbors, 3);
        assert_eq!(c.detector.min_size, (48, 64));
        assert_eq!(c.cascade_path, Some(PathBuf::from("/tmp/cascade.xml")));
        assert_eq!(c.password.as_deref(), Some("secret"));
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn detector_config_serde_round_trip() {
        let d = DetectorConfig {
            max_size: Some((400, 400)),
            ..DetectorConfig::default()
        };
        let json = serde_json::to_string(&d).unwrap();
        let back: DetectorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::All.to_indices(0), Vec::<usize>::new());
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(PageSelection::Range(3, 10).to_indices(4), vec![2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2] // deduplicated and sorted
        );
    }
}
