pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod secrets;
pub mod storage;

pub use config::{load_config, load_config_from_env, Config, UploadOrder};
pub use db::{Database, DatabaseError, DocumentRow, StoredDocument};
pub use error::{ConfigError, ErrorKind, ProcessError, Result, ScandocError, StorageError};
pub use pipeline::{
    Pipeline, PipelineConfig, PipelineContext, PipelineError, PipelineStage, ProcessedDocument,
    Submission,
};
pub use processor::{ImageExtractor, PageImage, Recognizer};
pub use secrets::{resolve_secret, SecretError, SecretRef};
pub use storage::BlobStore;
