//! Colour normalisation: rendered page bitmap → BGR buffer → grayscale.
//!
//! Rasterisers hand back either packed RGB or RGBA samples. Downstream stages
//! work on a single canonical layout, a 3-channel BGR buffer, so the alpha
//! channel is dropped here and any other layout is rejected up front rather
//! than guessed at.

use crate::error::FaceExtractError;
use crate::pipeline::crop::CropRect;
use image::{DynamicImage, GrayImage, RgbImage};

// Rec.601 luma weights in 14-bit fixed point: Y = 0.299 R + 0.587 G + 0.114 B.
const LUMA_SHIFT: u32 = 14;
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// Packed 8-bit page samples as produced by a rasteriser.
///
/// Row-major, `height × width × channels`. Valid pages have 3 (RGB) or 4
/// (RGBA) channels; other counts are representable so that
/// [`normalize`] can reject them with a proper error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBitmap {
    width: u32,
    height: u32,
    channels: u8,
    samples: Vec<u8>,
}

impl PageBitmap {
    /// Wrap raw samples, checking the buffer length against the dimensions.
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        samples: Vec<u8>,
    ) -> Result<Self, FaceExtractError> {
        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(FaceExtractError::Internal(format!(
                "bitmap {width}x{height}x{channels} needs {expected} bytes, got {}",
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    /// Take ownership of a decoded image, keeping its channel layout for
    /// 8-bit images. Deeper images are reduced to 8-bit RGBA.
    pub fn from_image(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let (channels, samples) = match img {
            DynamicImage::ImageLuma8(b) => (1, b.into_raw()),
            DynamicImage::ImageLumaA8(b) => (2, b.into_raw()),
            DynamicImage::ImageRgb8(b) => (3, b.into_raw()),
            DynamicImage::ImageRgba8(b) => (4, b.into_raw()),
            other => (4, other.to_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            channels,
            samples,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

/// 3-channel image with samples in blue, green, red order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BgrImage {
    /// Wrap a packed BGR buffer. Returns None if the length is wrong.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize * 3).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Single-channel luma derivative used by the detector.
    pub fn to_gray(&self) -> GrayImage {
        let luma: Vec<u8> = self
            .data
            .chunks_exact(3)
            .map(|bgr| {
                let (b, g, r) = (bgr[0] as u32, bgr[1] as u32, bgr[2] as u32);
                ((LUMA_B * b + LUMA_G * g + LUMA_R * r + LUMA_ROUND) >> LUMA_SHIFT) as u8
            })
            .collect();
        // Length is width*height by construction.
        GrayImage::from_raw(self.width, self.height, luma)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Copy `rect` out as an RGB image ready for an encoder.
    ///
    /// `rect` must lie within the image; [`crate::pipeline::crop::crop_rect`]
    /// guarantees that.
    pub fn crop_rgb(&self, rect: &CropRect) -> RgbImage {
        let row_bytes = self.width as usize * 3;
        let mut out = Vec::with_capacity(rect.width as usize * rect.height as usize * 3);
        for y in rect.y..rect.y + rect.height {
            let start = y as usize * row_bytes + rect.x as usize * 3;
            let end = start + rect.width as usize * 3;
            for bgr in self.data[start..end].chunks_exact(3) {
                out.extend_from_slice(&[bgr[2], bgr[1], bgr[0]]);
            }
        }
        RgbImage::from_raw(rect.width, rect.height, out)
            .unwrap_or_else(|| RgbImage::new(rect.width, rect.height))
    }
}

/// Convert a rendered page to BGR.
///
/// * 3 channels — read as RGB, reordered to BGR.
/// * 4 channels — read as RGBA, reordered to BGR, alpha dropped.
/// * anything else — [`FaceExtractError::UnsupportedFormat`].
///
/// `page_num` is 1-indexed and only used for the error.
pub fn normalize(bitmap: &PageBitmap, page_num: usize) -> Result<BgrImage, FaceExtractError> {
    let channels = bitmap.channels as usize;
    if channels != 3 && channels != 4 {
        return Err(FaceExtractError::UnsupportedFormat {
            page: page_num,
            channels: bitmap.channels,
        });
    }

    let mut data = Vec::with_capacity(bitmap.width as usize * bitmap.height as usize * 3);
    for px in bitmap.samples.chunks_exact(channels) {
        data.extend_from_slice(&[px[2], px[1], px[0]]);
    }

    Ok(BgrImage {
        width: bitmap.width,
        height: bitmap.height,
        data,
    })
}
