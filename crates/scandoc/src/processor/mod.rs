pub mod ocr;
pub mod pdf;
pub mod transcript;

use crate::error::ProcessError;

pub use ocr::TesseractRecognizer;
pub use pdf::PdfImageExtractor;
pub use transcript::aggregate;

/// One embedded raster image, addressed by its position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Zero-based page number.
    pub page_index: usize,
    /// Zero-based position among the images of that page.
    pub image_index: usize,
    pub bytes: Vec<u8>,
}

/// Images of a document in page order, then embedded order. Single pass.
pub type PageImages = Box<dyn Iterator<Item = PageImage>>;

/// Yields the embedded raster images of a PDF.
pub trait ImageExtractor: Send + Sync {
    /// Parses `pdf_bytes`. Structural problems are reported here, before the
    /// first image is produced.
    fn extract(&self, pdf_bytes: &[u8]) -> Result<PageImages, ProcessError>;
}

/// Turns one raster image into text.
pub trait Recognizer: Send + Sync {
    /// Returns the recognized text, which may be empty for blank images.
    fn recognize(&self, image_bytes: &[u8], language: &str) -> Result<String, ProcessError>;
}
