//! Face detection stage.
//!
//! The pipeline only knows the [`FaceDetector`] capability: grayscale bitmap
//! in, bounding boxes out. [`CascadeDetector`] is the stock implementation,
//! a Haar cascade driven by a [`DetectorConfig`]; tests and library callers
//! can substitute their own.

use crate::cascade::HaarCascade;
use crate::config::DetectorConfig;
use crate::error::FaceExtractError;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Axis-aligned face box in page-bitmap pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectionBox {
    /// X coordinate of the top-left corner.
    pub x: u32,
    /// Y coordinate of the top-left corner.
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DetectionBox {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Pluggable face detection backend.
///
/// Implementations return zero or more boxes in whatever order they produce
/// them; callers must not rely on a particular order.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a grayscale bitmap.
    fn detect(&self, gray: &GrayImage) -> Vec<DetectionBox>;
}

/// Face detector backed by a pretrained Haar cascade.
#[derive(Debug, Clone)]
pub struct CascadeDetector {
    cascade: HaarCascade,
    params: DetectorConfig,
}

impl CascadeDetector {
    /// Wrap an already loaded cascade.
    pub fn new(cascade: HaarCascade, params: DetectorConfig) -> Result<Self, FaceExtractError> {
        params.validate()?;
        Ok(Self { cascade, params })
    }

    /// Load a cascade XML file and wrap it.
    pub fn from_file(path: &Path, params: DetectorConfig) -> Result<Self, FaceExtractError> {
        Self::new(HaarCascade::from_file(path)?, params)
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&self, gray: &GrayImage) -> Vec<DetectionBox> {
        self.cascade.detect_multi_scale(gray, &self.params)
    }
}
