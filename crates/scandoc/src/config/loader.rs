use std::path::Path;

use crate::config::schema::{
    default_language, Config, DatabaseConfig, OcrConfig, OnConflict, PipelineSettings,
    ServerConfig, StorageConfig, UploadOrder,
};
use crate::error::ConfigError;
use crate::secrets::SecretRef;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub const SUPPORTED_VERSION: &str = "1.0";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Builds a config purely from environment variables.
///
/// `SUPABASE_URL` selects the Supabase store (key from `SUPABASE_KEY`,
/// bucket from `SUPABASE_BUCKET`); otherwise blobs go to `SCANDOC_STORAGE_DIR`
/// (default `./uploads`). `SCANDOC_DB`, `SCANDOC_BIND`, `SCANDOC_OCR_LANGUAGE`
/// and `SCANDOC_UPLOAD_ORDER` override the remaining defaults.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    let storage = match var("SUPABASE_URL") {
        Some(url) => StorageConfig::Supabase {
            url,
            bucket: var("SUPABASE_BUCKET").unwrap_or_else(|| "documents".to_string()),
            key: SecretRef::from_env("SUPABASE_KEY"),
            on_conflict: OnConflict::Fail,
        },
        None => StorageConfig::Filesystem {
            root: var("SCANDOC_STORAGE_DIR").unwrap_or_else(|| "uploads".to_string()),
            public_base_url: var("SCANDOC_PUBLIC_BASE_URL"),
            on_conflict: OnConflict::Fail,
        },
    };

    let upload_order = match var("SCANDOC_UPLOAD_ORDER").as_deref() {
        None | Some("validate_first") => UploadOrder::ValidateFirst,
        Some("upload_first") => UploadOrder::UploadFirst,
        Some(other) => {
            return Err(ConfigError::Validation {
                message: format!("Unknown SCANDOC_UPLOAD_ORDER: {}", other),
            })
        }
    };

    let ocr = OcrConfig {
        language: var("SCANDOC_OCR_LANGUAGE").unwrap_or_else(default_language),
        ..OcrConfig::default()
    };

    let server = match var("SCANDOC_BIND") {
        Some(bind) => ServerConfig {
            bind,
            ..ServerConfig::default()
        },
        None => ServerConfig::default(),
    };

    let config = Config {
        version: SUPPORTED_VERSION.to_string(),
        ocr,
        pipeline: PipelineSettings { upload_order },
        storage,
        database: DatabaseConfig {
            path: var("SCANDOC_DB"),
        },
        server,
    };

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if !is_valid_language(&config.ocr.language) {
        return Err(ConfigError::Validation {
            message: format!("Invalid OCR language: '{}'", config.ocr.language),
        });
    }

    if config.ocr.recognition_workers == 0 {
        return Err(ConfigError::Validation {
            message: "ocr.recognition_workers must be at least 1".to_string(),
        });
    }

    match &config.storage {
        StorageConfig::Filesystem { root, .. } if root.trim().is_empty() => {
            return Err(ConfigError::Validation {
                message: "storage.root must not be empty".to_string(),
            });
        }
        StorageConfig::Supabase { url, bucket, .. } => {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation {
                    message: format!("storage.url must be an http(s) URL: {}", url),
                });
            }
            if bucket.trim().is_empty() || bucket.contains('/') {
                return Err(ConfigError::Validation {
                    message: format!("Invalid storage bucket: '{}'", bucket),
                });
            }
        }
        _ => {}
    }

    Ok(())
}

/// Accepts Tesseract language specs such as `spa`, `chi_sim` or `spa+eng`.
fn is_valid_language(language: &str) -> bool {
    language.split('+').all(|code| {
        !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}
