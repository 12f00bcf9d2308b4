pub mod filesystem;
pub mod supabase;

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::{ConfigError, StorageError};

pub use filesystem::FileBlobStore;
pub use supabase::SupabaseBlobStore;

/// Publishes raw document bytes and returns where they can be fetched.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under the flat object `name` and returns its location URL.
    fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError>;
}

/// Builds the blob store described by the `storage` config section.
pub fn from_config(config: &StorageConfig) -> crate::error::Result<Arc<dyn BlobStore>> {
    match config {
        StorageConfig::Filesystem {
            root,
            public_base_url,
            on_conflict,
        } => Ok(Arc::new(FileBlobStore::new(
            root,
            public_base_url.clone(),
            *on_conflict,
        ))),
        StorageConfig::Supabase {
            url,
            bucket,
            key,
            on_conflict,
        } => {
            let key = key.resolve().map_err(|e| ConfigError::Secret {
                field: "storage.key".to_string(),
                source: e,
            })?;
            Ok(Arc::new(SupabaseBlobStore::new(
                url,
                bucket,
                key,
                *on_conflict,
            )?))
        }
    }
}

/// Rejects names that would escape a flat namespace.
pub(crate) fn check_object_name(name: &str) -> Result<(), StorageError> {
    match crate::sanitize::object_name(name) {
        Some(clean) if clean == name => Ok(()),
        _ => Err(StorageError::InvalidName(name.to_string())),
    }
}
