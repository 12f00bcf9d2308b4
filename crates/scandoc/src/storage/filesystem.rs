use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::OnConflict;
use crate::error::StorageError;
use crate::storage::{check_object_name, BlobStore};

/// Blob store backed by a local directory.
pub struct FileBlobStore {
    root: PathBuf,
    public_base_url: Option<String>,
    on_conflict: OnConflict,
}

impl FileBlobStore {
    pub fn new<P: AsRef<Path>>(
        root: P,
        public_base_url: Option<String>,
        on_conflict: OnConflict,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.filter(|url| !url.is_empty()),
            on_conflict,
        }
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| StorageError::CreateDirectory {
                path: self.root.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn write(&self, path: &Path, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let write_err = |e: std::io::Error| StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        };

        match self.on_conflict {
            OnConflict::Overwrite => std::fs::write(path, bytes).map_err(write_err),
            OnConflict::Fail => {
                // create_new makes the existence check and the creation one step
                let mut file = match std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(path)
                {
                    Ok(file) => file,
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                        return Err(StorageError::AlreadyExists(name.to_string()));
                    }
                    Err(e) => return Err(write_err(e)),
                };
                file.write_all(bytes).map_err(write_err)
            }
        }
    }

    fn location(&self, path: &Path, name: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), name),
            None => {
                let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                format!("file://{}", absolute.display())
            }
        }
    }
}

impl BlobStore for FileBlobStore {
    fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let _span = tracing::info_span!("storage.filesystem", name).entered();

        check_object_name(name)?;
        self.ensure_directory()?;

        let path = self.root.join(name);
        self.write(&path, name, bytes)?;

        tracing::debug!("Stored {} bytes as {}", bytes.len(), name);
        Ok(self.location(&path, name))
    }
}
