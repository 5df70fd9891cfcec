//! Content upload service: pushes files to the remote object store.
//!
//! Uploads are gated on size before any network traffic, named by a
//! deterministic collision-resistant storage key, and transport-encoded
//! as base64 because the remote content API only accepts text payloads.
//! Batches run strictly one file at a time; the remote rate-limits
//! aggressively and parallel uploads trip it.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{GistlinkError, Result};
use crate::remote::{DeleteObjectRequest, PutObjectRequest, RemoteStore};

/// The remote content API rejects payloads over 25 MiB.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedObject {
    /// Original filename, display only.
    pub name: String,
    /// Remote object identifier; see [`storage_key`].
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: usize,
    /// Publicly fetchable URL returned by the backend.
    pub location_url: String,
    /// Version token required for a later delete or overwrite.
    pub revision_id: String,
}

/// Derives the remote object name: `{millis}-{sanitized-name}`, where
/// every character outside `[A-Za-z0-9.-]` becomes `_`. No path
/// separators can survive, and the timestamp prefix keeps sequential
/// uploads from one client unique.
pub fn storage_key(timestamp_millis: i64, name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}-{}", timestamp_millis, sanitized)
}

pub struct UploadService {
    remote: Arc<dyn RemoteStore>,
    branch: String,
}

impl UploadService {
    pub fn new(remote: Arc<dyn RemoteStore>, branch: &str) -> Self {
        Self {
            remote,
            branch: branch.to_string(),
        }
    }

    pub async fn upload(&self, file: UploadFile) -> Result<UploadedObject> {
        let size_bytes = file.bytes.len();
        if size_bytes > MAX_UPLOAD_BYTES {
            // Rejected locally; the remote is never contacted.
            return Err(GistlinkError::too_large(format!(
                "{} is {} bytes, limit is {} bytes",
                file.name, size_bytes, MAX_UPLOAD_BYTES
            )));
        }

        let key = storage_key(chrono::Utc::now().timestamp_millis(), &file.name);
        let content = BASE64.encode(&file.bytes);
        let message = format!(
            "Upload {} ({:.2} MB)",
            file.name,
            size_bytes as f64 / 1024.0 / 1024.0
        );
        debug!("uploading {} as {}", file.name, key);

        let created = self
            .remote
            .put_object(
                &key,
                PutObjectRequest {
                    message,
                    content,
                    branch: self.branch.clone(),
                },
            )
            .await?;
        info!("uploaded {} ({} bytes) -> {}", file.name, size_bytes, key);

        Ok(UploadedObject {
            name: file.name,
            storage_key: key,
            content_type: file.content_type,
            size_bytes,
            location_url: created.download_url,
            revision_id: created.revision,
        })
    }

    /// Uploads a batch strictly in submission order, one at a time.
    /// Each file reports its own outcome; a failure does not abort the
    /// files after it.
    pub async fn upload_batch(&self, files: Vec<UploadFile>) -> Vec<Result<UploadedObject>> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.upload(file).await);
        }
        results
    }

    pub async fn delete(&self, storage_key: &str, revision_id: &str) -> Result<()> {
        self.remote
            .delete_object(
                storage_key,
                DeleteObjectRequest {
                    message: format!("Delete {}", storage_key),
                    revision: revision_id.to_string(),
                    branch: self.branch.clone(),
                },
            )
            .await
    }
}
