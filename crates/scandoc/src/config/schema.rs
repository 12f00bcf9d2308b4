use serde::{Deserialize, Serialize};

use crate::secrets::SecretRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language code(s), e.g. `spa` or `spa+eng`.
    #[serde(default = "default_language")]
    pub language: String,
    /// Threads used to recognize the images of a single document.
    #[serde(default = "default_recognition_workers")]
    pub recognition_workers: usize,
    /// Resolution reported to Tesseract for embedded images, which carry none.
    #[serde(default = "default_source_dpi")]
    pub source_dpi: i32,
}

pub(crate) fn default_language() -> String {
    "spa".to_string()
}

fn default_recognition_workers() -> usize {
    num_cpus::get().clamp(1, 4)
}

fn default_source_dpi() -> i32 {
    300
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            recognition_workers: default_recognition_workers(),
            source_dpi: default_source_dpi(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub upload_order: UploadOrder,
}

/// Whether the PDF structure is checked before or after the blob upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadOrder {
    /// Parse the PDF first; malformed input never reaches the blob store.
    #[default]
    ValidateFirst,
    /// Upload first, then parse. Malformed input leaves an orphaned blob.
    UploadFirst,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Filesystem {
        root: String,
        #[serde(default)]
        public_base_url: Option<String>,
        #[serde(default)]
        on_conflict: OnConflict,
    },
    Supabase {
        url: String,
        #[serde(default = "default_bucket")]
        bucket: String,
        key: SecretRef,
        #[serde(default)]
        on_conflict: OnConflict,
    },
}

fn default_bucket() -> String {
    "documents".to_string()
}

/// What the blob store does when an object with the same name exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnConflict {
    Overwrite,
    #[default]
    Fail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `~/.scandoc/data/scandoc.db`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> Option<std::path::PathBuf> {
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => Some(std::path::PathBuf::from(path)),
            _ => crate::db::default_database_path(),
        }
    }
}
