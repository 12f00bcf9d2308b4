use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};

use crate::config::OnConflict;
use crate::error::StorageError;
use crate::sanitize::redact_url;
use crate::storage::{check_object_name, BlobStore};

/// Blob store backed by the Supabase Storage REST API.
///
/// Uses a blocking client. Construct and drop it outside of an async
/// runtime; call `upload` from a blocking thread.
#[derive(Debug)]
pub struct SupabaseBlobStore {
    client: Client,
    base_url: String,
    bucket: String,
    key: SecretString,
    upsert: bool,
}

impl SupabaseBlobStore {
    pub fn new(
        url: &str,
        bucket: &str,
        key: SecretString,
        on_conflict: OnConflict,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .user_agent(concat!("scandoc/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            key,
            upsert: on_conflict == OnConflict::Overwrite,
        })
    }

    /// Endpoint the object is written to.
    pub fn object_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, name
        )
    }

    /// Public address returned to callers.
    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }
}

fn content_type(name: &str) -> &'static str {
    if name.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

impl BlobStore for SupabaseBlobStore {
    fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let _span = tracing::info_span!("storage.supabase", bucket = %self.bucket, name).entered();

        check_object_name(name)?;

        let url = self.object_url(name);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.key.expose_secret())
            .header("apikey", self.key.expose_secret())
            .header(CONTENT_TYPE, content_type(name))
            .header("x-upsert", if self.upsert { "true" } else { "false" })
            .body(bytes.to_vec())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(
                "Upload to {} rejected with status {}",
                redact_url(&url),
                status
            );
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(self.public_url(name))
    }
}
