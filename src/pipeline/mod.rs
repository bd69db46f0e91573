//! Pipeline stages for PDF face extraction.
//!
//! Each submodule implements one transformation step and is tested on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ color ──▶ detect ──▶ crop
//! (path)    (pdfium)   (BGR/gray) (cascade)  (JPEG files)
//! ```
//!
//! 1. [`input`]  — check the user-supplied path is a readable PDF
//! 2. [`render`] — rasterise one page at a time at 3× zoom
//! 3. [`color`]  — normalise RGB/RGBA samples to BGR and derive grayscale
//! 4. [`detect`] — find face boxes on the grayscale bitmap
//! 5. [`crop`]   — expand each box by a margin, clip, and write `face_<n>.jpg`

pub mod color;
pub mod crop;
pub mod detect;
pub mod input;
pub mod render;
