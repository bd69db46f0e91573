//! Haar cascade face detector.
//!
//! A pretrained boosted cascade (the `haarcascade_frontalface_*.xml` files
//! shipped with OpenCV) is loaded from XML and scanned over an image pyramid.
//!
//! ## Scan
//!
//! For `factor = 1, s, s², …` (with `s` the configured scale factor) the
//! detection window is `round(base × factor)`. Scales whose window is below
//! `min_size` are skipped; the scan stops once the window exceeds the image
//! or `max_size`. At each scale the image is downsampled by `factor` and the
//! base-size window slides over it with a step of 2 pixels (1 pixel once
//! `factor > 2`). A window is a hit when it passes every stage.
//!
//! ## Window evaluation
//!
//! Feature responses are normalised by the standard deviation of the window
//! (inset by one pixel), which makes the cascade insensitive to contrast.
//! Each weak classifier is a small decision tree over feature responses; a
//! stage passes when the sum of its leaf values reaches the stage threshold.
//!
//! Raw hits are merged by [`group::group_rectangles`].

pub mod group;
pub mod integral;
mod xml;

use crate::config::DetectorConfig;
use crate::error::FaceExtractError;
use crate::pipeline::detect::DetectionBox;
use image::imageops::{self, FilterType};
use image::GrayImage;
use integral::IntegralImage;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// File name of the stock frontal-face cascade.
pub const DEFAULT_CASCADE_FILE: &str = "haarcascade_frontalface_default.xml";

/// Directories where OpenCV distributions install their cascades.
pub const CASCADE_SEARCH_DIRS: &[&str] = &[
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/usr/local/share/opencv/haarcascades",
    "/opt/homebrew/share/opencv4/haarcascades",
    "/opt/local/share/opencv4/haarcascades",
];

/// A loaded boosted Haar cascade.
#[derive(Debug, Clone)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

#[derive(Debug, Clone)]
struct Stage {
    threshold: f64,
    classifiers: Vec<WeakClassifier>,
}

#[derive(Debug, Clone)]
struct WeakClassifier {
    nodes: Vec<TreeNode>,
    leaves: Vec<f64>,
}

/// Split node. Children `> 0` index `nodes`; children `<= 0` are `-leaf`.
#[derive(Debug, Clone, Copy)]
struct TreeNode {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone)]
struct HaarFeature {
    rects: Vec<WeightedRect>,
}

#[derive(Debug, Clone, Copy)]
struct WeightedRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f64,
}

impl HaarCascade {
    /// Load a cascade from an XML file.
    pub fn from_file(path: &Path) -> Result<Self, FaceExtractError> {
        let xml = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FaceExtractError::CascadeNotFound {
                path: Some(path.to_path_buf()),
            },
            _ => FaceExtractError::CascadeFormat {
                path: path.to_path_buf(),
                detail: e.to_string(),
            },
        })?;
        Self::from_xml_str(&xml, path)
    }

    /// Parse cascade XML. `source` is only used in error messages.
    pub fn from_xml_str(xml: &str, source: &Path) -> Result<Self, FaceExtractError> {
        let cascade = xml::parse_cascade(xml).map_err(|detail| FaceExtractError::CascadeFormat {
            path: source.to_path_buf(),
            detail,
        })?;
        debug!(
            "Loaded cascade {}: {}x{} window, {} stages, {} features",
            source.display(),
            cascade.window_width,
            cascade.window_height,
            cascade.stages.len(),
            cascade.features.len()
        );
        Ok(cascade)
    }

    /// Base detection window `(width, height)`.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Detect objects at all scales and merge overlapping hits.
    pub fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        params: &DetectorConfig,
    ) -> Vec<DetectionBox> {
        let raw = self.scan(gray, params);
        let grouped = group::group_rectangles(raw, params.min_neighbors, group::GROUP_EPS);
        debug!("Cascade produced {} detection(s)", grouped.len());
        grouped
    }

    /// Every window that passes the cascade, before grouping.
    pub fn scan(&self, gray: &GrayImage, params: &DetectorConfig) -> Vec<DetectionBox> {
        let (img_w, img_h) = gray.dimensions();
        let (max_w, max_h) = params.max_size.unwrap_or((img_w, img_h));
        let (min_w, min_h) = params.min_size;
        let (base_w, base_h) = (self.window_width, self.window_height);

        let mut hits = Vec::new();
        let mut factor = 1.0f64;
        loop {
            let win_w = (base_w as f64 * factor).round() as u32;
            let win_h = (base_h as f64 * factor).round() as u32;
            if win_w > img_w || win_h > img_h || win_w > max_w || win_h > max_h {
                break;
            }
            if win_w >= min_w && win_h >= min_h {
                let scaled_w = (img_w as f64 / factor).round() as u32;
                let scaled_h = (img_h as f64 / factor).round() as u32;
                if scaled_w < base_w || scaled_h < base_h {
                    break;
                }

                let scaled: Cow<'_, GrayImage> = if factor == 1.0 {
                    Cow::Borrowed(gray)
                } else {
                    Cow::Owned(imageops::resize(gray, scaled_w, scaled_h, FilterType::Triangle))
                };
                let ii = IntegralImage::new(&scaled);
                let step = if factor > 2.0 { 1 } else { 2 };

                let before = hits.len();
                for y in (0..=scaled_h - base_h).step_by(step) {
                    for x in (0..=scaled_w - base_w).step_by(step) {
                        if self.evaluate(&ii, x, y) {
                            hits.push(DetectionBox::new(
                                (x as f64 * factor).round() as u32,
                                (y as f64 * factor).round() as u32,
                                win_w,
                                win_h,
                            ));
                        }
                    }
                }
                trace!(
                    "scale {:.3}: window {}x{}, {} hit(s)",
                    factor,
                    win_w,
                    win_h,
                    hits.len() - before
                );
            }
            factor *= params.scale_factor;
        }
        hits
    }

    /// Run all stages on the base-size window at `(x, y)`.
    fn evaluate(&self, ii: &IntegralImage, x: u32, y: u32) -> bool {
        let (nw, nh) = (self.window_width - 2, self.window_height - 2);
        let area = (nw * nh) as f64;
        let sum = ii.rect_sum(x + 1, y + 1, nw, nh) as f64;
        let sq_sum = ii.rect_sq_sum(x + 1, y + 1, nw, nh) as f64;
        let variance = area * sq_sum - sum * sum;
        let norm = if variance > 0.0 { variance.sqrt() } else { 1.0 };

        self.stages.iter().all(|stage| {
            let score: f64 = stage
                .classifiers
                .iter()
                .map(|weak| self.tree_response(weak, ii, x, y, norm))
                .sum();
            score >= stage.threshold
        })
    }

    fn tree_response(&self, weak: &WeakClassifier, ii: &IntegralImage, x: u32, y: u32, norm: f64) -> f64 {
        let mut idx: i32 = 0;
        loop {
            let node = &weak.nodes[idx as usize];
            let value = self.features[node.feature].response(ii, x, y) / norm;
            idx = if value < node.threshold { node.left } else { node.right };
            if idx <= 0 {
                break;
            }
        }
        weak.leaves[(-idx) as usize]
    }
}

impl HaarFeature {
    /// Weighted sum of the feature's rectangles for the window at `(x, y)`.
    fn response(&self, ii: &IntegralImage, x: u32, y: u32) -> f64 {
        self.rects
            .iter()
            .map(|r| r.weight * ii.rect_sum(x + r.x, y + r.y, r.width, r.height) as f64)
            .sum()
    }
}

/// Find a cascade file.
///
/// An explicit path must exist. Otherwise [`DEFAULT_CASCADE_FILE`] is looked
/// up in the working directory and then in [`CASCADE_SEARCH_DIRS`].
pub fn locate_cascade(explicit: Option<&Path>) -> Result<PathBuf, FaceExtractError> {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(CASCADE_SEARCH_DIRS.iter().map(PathBuf::from));
    locate_in(explicit, &dirs)
}

fn locate_in(explicit: Option<&Path>, dirs: &[PathBuf]) -> Result<PathBuf, FaceExtractError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(FaceExtractError::CascadeNotFound {
                path: Some(path.to_path_buf()),
            })
        };
    }

    for dir in dirs {
        let candidate = dir.join(DEFAULT_CASCADE_FILE);
        if candidate.is_file() {
            debug!("Using cascade {}", candidate.display());
            return Ok(candidate);
        }
    }
    Err(FaceExtractError::CascadeNotFound { path: None })
}
