//! Resume documents and their first-page image payloads
//!
//! A resume is sent to the model as a picture of its first page, never as
//! extracted text. Rendering goes through [`PageRenderer`] so the batch
//! pipeline can be driven without a pdfium library present.

use crate::error::{Result, ScreenerError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use log::debug;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// An uploaded resume: file name plus raw PDF bytes
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Encoded image of a single page, ready for a multimodal request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    pub mime_type: String,
    /// Base64 (standard alphabet) JPEG bytes
    pub data: String,
}

pub trait PageRenderer {
    fn render_first_page(&self, pdf: &[u8]) -> Result<DynamicImage>;
}

impl ResumeDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(filename, bytes))
    }

    /// Convert the first page into a JPEG payload, consuming the document
    pub fn into_page_image<R: PageRenderer>(self, renderer: &R, jpeg_quality: u8) -> Result<PageImage> {
        if self.bytes.is_empty() {
            return Err(ScreenerError::EmptyInput(format!("'{}' has no content", self.filename)));
        }

        let page = renderer.render_first_page(&self.bytes)?;
        let jpeg = encode_jpeg(&page, jpeg_quality)?;
        debug!(
            "Rendered first page of '{}' ({}x{}, {} bytes as JPEG)",
            self.filename,
            page.width(),
            page.height(),
            jpeg.len()
        );

        Ok(PageImage::from_jpeg(&jpeg))
    }
}

impl PageImage {
    pub fn from_jpeg(jpeg: &[u8]) -> Self {
        Self {
            mime_type: JPEG_MIME_TYPE.to_string(),
            data: STANDARD.encode(jpeg),
        }
    }
}

/// JPEG has no alpha channel, so the page is flattened to RGB first
pub fn encode_jpeg(page: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = page.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&rgb)
        .map_err(|e| ScreenerError::ImageEncoding(e.to_string()))?;
    Ok(buffer)
}

/// Renders PDF pages with a dynamically bound pdfium library
pub struct PdfiumRenderer {
    pdfium: Pdfium,
    target_width: i32,
}

impl PdfiumRenderer {
    /// Looks for libpdfium in the working directory first, then the system paths
    pub fn new(target_width: i32) -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| {
                ScreenerError::PdfRender(format!(
                    "Failed to load the pdfium library (place libpdfium next to the binary or install it system-wide): {:?}",
                    e
                ))
            })?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            target_width,
        })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_first_page(&self, pdf: &[u8]) -> Result<DynamicImage> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ScreenerError::PdfRender(format!("Failed to open PDF: {:?}", e)))?;

        let page = document
            .pages()
            .get(0)
            .map_err(|e| ScreenerError::PdfRender(format!("PDF has no first page: {:?}", e)))?;

        let config = PdfRenderConfig::new().set_target_width(self.target_width);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ScreenerError::PdfRender(format!("Failed to render first page: {:?}", e)))?;

        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;
        let pixels = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
            .ok_or_else(|| ScreenerError::PdfRender("Rendered bitmap has an unexpected size".to_string()))?;

        Ok(DynamicImage::ImageRgba8(pixels))
    }
}
