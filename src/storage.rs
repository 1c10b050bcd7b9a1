//! Durable blob storage for published files.
//!
//! The [`BlobStore`] trait is the seam between the pipeline and the storage
//! vendor: upload one local file to a named container at a logical path,
//! `image/jpeg`, create-or-replace semantics. The production implementation
//! is [`SasBlobStore`], a thin HTTP client that PUTs blobs against a
//! SAS-signed endpoint parsed from a connection string of the form:
//!
//! ```text
//! BlobEndpoint=https://acct.blob.example.net;SharedAccessSignature=sv=...&sig=...
//! ```
//!
//! Upload failures are fatal to the run — the manifest must never reference
//! a rendition that didn't land in the container.

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid storage connection string: {0}")]
    Connection(String),
    #[error("Upload of {blob} rejected with status {status}")]
    Rejected { blob: String, status: u16 },
}

/// Uploads local files to a durable container.
pub trait BlobStore {
    /// Upload `local` to `container` under `cloud_path` (may be empty for
    /// the container root), replacing any existing blob of the same name.
    fn upload(&self, local: &Path, container: &str, cloud_path: &str)
    -> Result<(), StorageError>;
}

/// Blob store client authenticating with a shared-access signature.
pub struct SasBlobStore {
    endpoint: String,
    sas: String,
    client: reqwest::blocking::Client,
}

impl SasBlobStore {
    pub fn from_connection_string(connection: &str) -> Result<Self, StorageError> {
        let mut endpoint = None;
        let mut sas = None;
        for part in connection.split(';') {
            match part.split_once('=') {
                Some(("BlobEndpoint", v)) => endpoint = Some(v.trim_end_matches('/').to_string()),
                Some(("SharedAccessSignature", v)) => {
                    sas = Some(v.trim_start_matches('?').to_string())
                }
                _ => {}
            }
        }
        let endpoint = endpoint
            .ok_or_else(|| StorageError::Connection("missing BlobEndpoint".into()))?;
        let sas =
            sas.ok_or_else(|| StorageError::Connection("missing SharedAccessSignature".into()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            endpoint,
            sas,
            client,
        })
    }

    fn blob_url(&self, container: &str, blob_name: &str) -> String {
        format!("{}/{}/{}?{}", self.endpoint, container, blob_name, self.sas)
    }
}

impl BlobStore for SasBlobStore {
    fn upload(
        &self,
        local: &Path,
        container: &str,
        cloud_path: &str,
    ) -> Result<(), StorageError> {
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let blob_name = join_blob_path(cloud_path, &file_name);
        let body = std::fs::read(local)?;

        let response = self
            .client
            .put(self.blob_url(container, &blob_name))
            .header("x-ms-blob-type", "BlockBlob")
            .header("content-type", "image/jpeg")
            .body(body)
            .send()?;

        if !response.status().is_success() {
            return Err(StorageError::Rejected {
                blob: blob_name,
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Join a logical cloud path and a file name without doubling separators.
pub fn join_blob_path(cloud_path: &str, file_name: &str) -> String {
    let trimmed = cloud_path.trim_matches('/');
    if trimmed.is_empty() {
        file_name.to_string()
    } else {
        format!("{trimmed}/{file_name}")
    }
}
