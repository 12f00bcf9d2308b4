use serde::Serialize;

use crate::processor::PageImages;

use super::error::PipelineWarning;

/// One uploaded file as received from the caller.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Filename as supplied; stored verbatim as the document name.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Submission {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Non-terminal states of a run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Uploading,
    Extracting,
    Recognizing,
    Aggregating,
    Persisting,
    Completed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Uploading => "uploading",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Recognizing => "recognizing",
            PipelineStage::Aggregating => "aggregating",
            PipelineStage::Persisting => "persisting",
            PipelineStage::Completed => "completed",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognition result for one embedded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognizedUnit {
    pub page_index: usize,
    pub image_index: usize,
    /// Empty when recognition failed.
    pub text: String,
    pub failed: bool,
}

/// Successful outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    pub document_id: i64,
    pub name: String,
    pub location: String,
    pub transcript: String,
    pub units: Vec<RecognizedUnit>,
    pub warnings: Vec<PipelineWarning>,
}

pub struct PipelineContext {
    // Input
    pub submission: Submission,

    // Flat blob store name derived from the filename
    pub object_name: Option<String>,

    pub stage: PipelineStage,

    // Parsed document; set before upload with validate_first, after it otherwise
    pub images: Option<PageImages>,

    // Uploading result
    pub location: Option<String>,

    // Recognizing result, in page-then-image order
    pub units: Vec<RecognizedUnit>,

    // Aggregating result
    pub transcript: Option<String>,

    // Persisting result
    pub document_id: Option<i64>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(submission: Submission) -> Self {
        Self {
            submission,
            object_name: None,
            stage: PipelineStage::Received,
            images: None,
            location: None,
            units: Vec::new(),
            transcript: None,
            document_id: None,
            warnings: Vec::new(),
        }
    }
}
