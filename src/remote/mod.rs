//! Adapter boundary for the remote object-store-and-document API.
//!
//! Two backends implement [`RemoteStore`]: the HTTP client used in
//! production and an in-memory store for tests and local development.
//! The document operations carry a revision token so callers can do
//! conditional writes; a stale `expected_revision` must surface as
//! `ConcurrentModification`, never as a silent overwrite.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub mod http;
pub mod memory;

/// Body of an object create-or-overwrite call.
#[derive(Debug, Clone, Serialize)]
pub struct PutObjectRequest {
    /// Human-readable commit-style message.
    pub message: String,
    /// Transport-encoded (base64) payload.
    pub content: String,
    pub branch: String,
}

/// Body of an object delete call. The revision must match the object's
/// current version or the backend rejects the delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteObjectRequest {
    pub message: String,
    pub revision: String,
    pub branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectCreated {
    /// Publicly fetchable URL of the stored object.
    pub download_url: String,
    /// Opaque version token, required for later delete/overwrite.
    pub revision: String,
}

/// A document read paired with the revision it was read at.
#[derive(Debug, Clone)]
pub struct VersionedDocument {
    /// Raw text content of the named file inside the document.
    pub content: String,
    pub revision: String,
}

#[derive(Debug, Clone)]
pub struct PatchDocumentRequest {
    /// File inside the document to overwrite.
    pub file_name: String,
    pub content: String,
    /// When set, the write only succeeds if the document is still at
    /// this revision.
    pub expected_revision: Option<String>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn put_object(&self, key: &str, req: PutObjectRequest) -> Result<ObjectCreated>;

    async fn delete_object(&self, key: &str, req: DeleteObjectRequest) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<VersionedDocument>;

    /// Overwrites the named file's content, returning the new revision.
    async fn patch_document(&self, id: &str, req: PatchDocumentRequest) -> Result<String>;

    fn backend_name(&self) -> &'static str;
}
