use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScandocError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}

/// Failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// The submitted bytes are not a readable PDF.
    MalformedInput,
    /// An embedded image could not be decoded. Absorbed per image.
    UnsupportedImage,
    /// Publishing the PDF to the blob store failed.
    StorageFailure,
    /// Inserting or committing the document records failed.
    PersistenceFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "MalformedInput",
            ErrorKind::UnsupportedImage => "UnsupportedImage",
            ErrorKind::StorageFailure => "StorageFailure",
            ErrorKind::PersistenceFailure => "PersistenceFailure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to resolve secret for '{field}': {source}")]
    Secret {
        field: String,
        #[source]
        source: crate::secrets::SecretError,
    },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Malformed PDF: {0}")]
    MalformedInput(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::MalformedInput(_) => ErrorKind::MalformedInput,
            ProcessError::UnsupportedImage(_) | ProcessError::OcrFailed(_) => {
                ErrorKind::UnsupportedImage
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid object name '{0}'")]
    InvalidName(String),

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, ScandocError>;
