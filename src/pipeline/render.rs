//! Page rasterisation.
//!
//! The pipeline reads pages through the [`PageSource`] trait so the
//! detection loop can run against pdfium ([`PdfPageSource`]) or against
//! bitmaps already in memory ([`BitmapPageSource`]).
//!
//! Pages are rendered at [`RENDER_SCALE`]× their natural size (3 × 72 = 216
//! DPI). Faces in typical document photos are then comfortably above the
//! detector's 100 px minimum.

use crate::error::FaceExtractError;
use crate::output::DocumentMetadata;
use crate::pipeline::color::PageBitmap;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Zoom factor applied to every page when rendering.
pub const RENDER_SCALE: f32 = 3.0;

/// An ordered, finite sequence of rasterisable pages.
pub trait PageSource {
    /// Number of pages. May be zero.
    fn page_count(&self) -> usize;

    /// Render the page at 0-based `index`.
    ///
    /// Returns [`FaceExtractError::PageOutOfRange`] when
    /// `index >= page_count()`.
    fn rasterize(&self, index: usize) -> Result<PageBitmap, FaceExtractError>;
}

/// A PDF document opened through pdfium.
pub struct PdfPageSource<'a> {
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
}

impl<'a> PdfPageSource<'a> {
    /// Open `path`, mapping pdfium's open failures onto typed errors.
    pub fn open(
        pdfium: &'a Pdfium,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Self, FaceExtractError> {
        let document = pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    FaceExtractError::WrongPassword {
                        path: path.to_path_buf(),
                    }
                } else {
                    FaceExtractError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                }
            } else {
                FaceExtractError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        info!(
            "PDF loaded: {} ({} pages)",
            path.display(),
            document.pages().len()
        );

        Ok(Self {
            document,
            render_config: PdfRenderConfig::new().scale_page_by_factor(RENDER_SCALE),
        })
    }

    /// Document information dictionary plus page count and PDF version.
    pub fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            page_count: self.page_count(),
            pdf_version: format!("{:?}", self.document.version()),
        }
    }
}

impl PageSource for PdfPageSource<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn rasterize(&self, index: usize) -> Result<PageBitmap, FaceExtractError> {
        let total = self.page_count();
        if index >= total {
            return Err(FaceExtractError::PageOutOfRange {
                page: index + 1,
                total,
            });
        }

        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| FaceExtractError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&self.render_config).map_err(|e| {
            FaceExtractError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );

        Ok(PageBitmap::from_image(image))
    }
}

/// Pages held in memory, e.g. scans decoded with the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct BitmapPageSource {
    pages: Vec<PageBitmap>,
}

impl BitmapPageSource {
    pub fn new(pages: Vec<PageBitmap>) -> Self {
        Self { pages }
    }
}

impl PageSource for BitmapPageSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn rasterize(&self, index: usize) -> Result<PageBitmap, FaceExtractError> {
        self.pages
            .get(index)
            .cloned()
            .ok_or(FaceExtractError::PageOutOfRange {
                page: index + 1,
                total: self.pages.len(),
            })
    }
}
