//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` wires the real lopdf extractor and filesystem blob
//! store to a temp directory and a file-backed database. Tesseract is
//! replaced by `ShadeRecognizer`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use scandoc::config::{OnConflict, UploadOrder};
use scandoc::db::document_repo;
use scandoc::pipeline::{NoopProgress, PipelineConfig};
use scandoc::processor::PdfImageExtractor;
use scandoc::storage::FileBlobStore;
use scandoc::{
    Database, DocumentRow, Pipeline, PipelineError, ProcessError, ProcessedDocument, Recognizer,
    Submission,
};

/// Shades further than this from every scripted shade recognize as "".
const SHADE_TOLERANCE: u8 = 8;

/// Fake OCR engine: decodes the image for real, then reads the shade of its
/// first pixel and returns the text scripted for the nearest shade.
#[derive(Default)]
pub struct ShadeRecognizer {
    texts: BTreeMap<u8, String>,
}

impl ShadeRecognizer {
    pub fn script(mut self, shade: u8, text: &str) -> Self {
        self.texts.insert(shade, text.to_string());
        self
    }
}

impl Recognizer for ShadeRecognizer {
    fn recognize(&self, image_bytes: &[u8], _language: &str) -> Result<String, ProcessError> {
        let img = image::load_from_memory(image_bytes)
            .map_err(|e| ProcessError::UnsupportedImage(e.to_string()))?;
        let shade = img.to_luma8().get_pixel(0, 0).0[0];

        let text = self
            .texts
            .iter()
            .find(|(scripted, _)| scripted.abs_diff(shade) <= SHADE_TOLERANCE)
            .map(|(_, text)| text.clone())
            .unwrap_or_default();
        Ok(text)
    }
}

/// Test harness providing an isolated storage root and database.
pub struct TestHarness {
    /// Temporary directory holding the blob root and the database file.
    temp_dir: TempDir,
    /// Where the filesystem blob store writes.
    pub storage_dir: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let storage_dir = temp_dir.path().join("uploads");
        let db = Database::open(&temp_dir.path().join("data").join("scandoc.db"))
            .expect("Failed to open database");

        Self {
            temp_dir,
            storage_dir,
            db,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Pipeline with the real extractor and filesystem store.
    pub fn pipeline(&self, recognizer: ShadeRecognizer, upload_order: UploadOrder) -> Pipeline {
        let config = PipelineConfig {
            language: "spa".to_string(),
            recognition_workers: 3,
            upload_order,
        };

        Pipeline::new(
            config,
            Arc::new(PdfImageExtractor::new()),
            Arc::new(recognizer),
            Arc::new(FileBlobStore::new(
                &self.storage_dir,
                Some("http://files.test/uploads".to_string()),
                OnConflict::Fail,
            )),
            self.db.clone(),
        )
    }

    pub fn submit(
        &self,
        pipeline: &Pipeline,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ProcessedDocument, PipelineError> {
        pipeline.process(Submission::new(filename, bytes), &NoopProgress)
    }

    /// Names of every object in the blob store, sorted.
    pub fn stored_objects(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.storage_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn documents(&self) -> Vec<DocumentRow> {
        document_repo::list_documents(&self.db).expect("Failed to list documents")
    }
}
