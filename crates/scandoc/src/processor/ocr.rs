use std::io::Cursor;

use crate::error::ProcessError;
use crate::processor::Recognizer;

/// Resolution reported to Tesseract when the config does not set one.
const DEFAULT_SOURCE_DPI: i32 = 300;

/// Recognizer backed by a local Tesseract installation.
///
/// A fresh engine is created per image, so one instance can be shared by
/// all recognition workers.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    source_dpi: i32,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self {
            source_dpi: DEFAULT_SOURCE_DPI,
        }
    }

    pub fn with_source_dpi(mut self, dpi: i32) -> Self {
        self.source_dpi = dpi;
        self
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes any raster format `image` understands and re-encodes it as PNG.
fn normalize_to_png(image_bytes: &[u8]) -> Result<Vec<u8>, ProcessError> {
    let img = image::load_from_memory(image_bytes)
        .map_err(|e| ProcessError::UnsupportedImage(format!("Failed to load image: {}", e)))?;

    let mut png_data = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
        .map_err(|e| ProcessError::UnsupportedImage(format!("Failed to convert image: {}", e)))?;

    Ok(png_data)
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image_bytes: &[u8], language: &str) -> Result<String, ProcessError> {
        let _span = tracing::info_span!("processor.ocr", language).entered();

        let png_data = normalize_to_png(image_bytes)?;

        let mut lt = leptess::LepTess::new(None, language).map_err(|e| {
            ProcessError::OcrFailed(format!("Failed to initialize Tesseract: {}", e))
        })?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to set image for OCR: {}", e)))?;
        lt.set_source_resolution(self.source_dpi);

        lt.get_utf8_text()
            .map_err(|e| ProcessError::OcrFailed(format!("OCR failed: {}", e)))
    }
}
