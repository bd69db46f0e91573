//! Crop & persist: expand detections by a margin, clip, and write JPEGs.
//!
//! ## Geometry
//!
//! For a detection `(x, y, w, h)` on a `W × H` bitmap the margin is
//! `m = floor(0.2 × w)` on every side (the width-derived margin is also used
//! vertically). The written region is
//! `[max(0, x-m), min(W, x+w+m)) × [max(0, y-m), min(H, y+h+m))`,
//! so it can never leave the bitmap.
//!
//! ## Naming
//!
//! Files are `face_1.jpg`, `face_2.jpg`, … numbered by a single counter that
//! lives in [`FaceWriter`] for the duration of one run: no gaps and no reset
//! at page boundaries.

use crate::error::FaceExtractError;
use crate::output::SavedFace;
use crate::pipeline::color::BgrImage;
use crate::pipeline::detect::DetectionBox;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fraction of the detection width added around the box before cropping.
pub const CROP_MARGIN_RATIO: f64 = 0.2;

/// A region of the page bitmap, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Margin for a detection of the given width: `floor(0.2 × width)`.
pub fn margin_for(width: u32) -> u32 {
    (width as f64 * CROP_MARGIN_RATIO) as u32
}

/// Expand `detection` by its margin and clip it to an `img_width × img_height` bitmap.
pub fn crop_rect(detection: &DetectionBox, img_width: u32, img_height: u32) -> CropRect {
    let m = margin_for(detection.width);

    let x1 = detection.x.saturating_sub(m).min(img_width);
    let y1 = detection.y.saturating_sub(m).min(img_height);
    let x2 = detection
        .x
        .saturating_add(detection.width)
        .saturating_add(m)
        .min(img_width);
    let y2 = detection
        .y
        .saturating_add(detection.height)
        .saturating_add(m)
        .min(img_height);

    CropRect {
        x: x1,
        y: y1,
        width: x2.saturating_sub(x1),
        height: y2.saturating_sub(y1),
    }
}

/// `face_<index>.jpg`.
pub fn face_file_name(index: usize) -> String {
    format!("face_{index}.jpg")
}

/// Create `dir` and its parents. Succeeds if it already exists.
pub fn ensure_output_dir(dir: &Path) -> Result<(), FaceExtractError> {
    std::fs::create_dir_all(dir).map_err(|e| FaceExtractError::OutputDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Encode `image` as JPEG (encoder default quality) and write it to `path`.
///
/// Atomic write: the bytes go to `<path>.tmp` first and are renamed into
/// place, so a crash never leaves a truncated `face_<n>.jpg` behind.
pub fn write_jpeg(image: &RgbImage, path: &Path) -> Result<(), FaceExtractError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(|e| FaceExtractError::EncodeFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let tmp_path = path.with_extension("jpg.tmp");
    std::fs::write(&tmp_path, &buf).map_err(|e| FaceExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| FaceExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    debug!("Wrote {} ({} bytes)", path.display(), buf.len());
    Ok(())
}

/// Writes face crops into one output directory, owning the run's counter.
#[derive(Debug)]
pub struct FaceWriter {
    dir: PathBuf,
    saved: usize,
}

impl FaceWriter {
    /// Create the output directory (idempotently) and start counting at 1.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, FaceExtractError> {
        let dir = dir.into();
        ensure_output_dir(&dir)?;
        Ok(Self { dir, saved: 0 })
    }

    /// Faces written so far.
    pub fn saved(&self) -> usize {
        self.saved
    }

    /// Crop `detection` (with margin) out of `page` and write the next `face_<n>.jpg`.
    ///
    /// The counter only advances once the file is on disk.
    pub fn save(
        &mut self,
        page: &BgrImage,
        detection: &DetectionBox,
        page_num: usize,
    ) -> Result<SavedFace, FaceExtractError> {
        let crop = crop_rect(detection, page.width(), page.height());
        if crop.is_empty() {
            return Err(FaceExtractError::EmptyCrop {
                page: page_num,
                detection: *detection,
                width: page.width(),
                height: page.height(),
            });
        }

        let index = self.saved + 1;
        let file_name = face_file_name(index);
        let path = self.dir.join(&file_name);

        write_jpeg(&page.crop_rgb(&crop), &path)?;
        self.saved = index;

        info!("Saved: {} (page {})", file_name, page_num);
        Ok(SavedFace {
            index,
            file_name,
            path,
            page_num,
            detection: *detection,
            crop,
        })
    }
}
