//! In-memory [`RemoteStore`] used by tests and local development.
//!
//! Behaves like the real backend where it matters: object writes hand
//! back a download URL and a revision token, document writes bump a
//! monotonic revision, and a conditional patch against a stale revision
//! is rejected with `ConcurrentModification`.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{
    DeleteObjectRequest, ObjectCreated, PatchDocumentRequest, PutObjectRequest, RemoteStore,
    VersionedDocument,
};
use crate::errors::{GistlinkError, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    content: String,
    revision: String,
}

#[derive(Debug, Clone, Default)]
struct Document {
    files: HashMap<String, String>,
    revision: u64,
}

#[derive(Default)]
pub struct MemoryRemoteStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    documents: RwLock<HashMap<String, Document>>,
    /// File name served back by `get_document`.
    primary_file: String,
    revision_counter: AtomicU64,
    write_count: AtomicUsize,
    /// Object puts whose key contains any of these substrings fail.
    poisoned: RwLock<Vec<String>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            primary_file: "urls.json".to_string(),
            ..Default::default()
        }
    }

    pub fn with_primary_file(file: &str) -> Self {
        Self {
            primary_file: file.to_string(),
            ..Default::default()
        }
    }

    /// Number of mutating calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Makes object puts whose key contains `fragment` fail with a
    /// rate-limit error. Lets tests exercise partial batch failure.
    pub fn fail_puts_containing(&self, fragment: &str) {
        self.poisoned.write().unwrap().push(fragment.to_string());
    }

    /// Current content of the primary file, for assertions.
    pub fn document_content(&self, id: &str) -> Option<String> {
        self.documents
            .read()
            .unwrap()
            .get(id)
            .and_then(|d| d.files.get(&self.primary_file).cloned())
    }

    pub fn object_exists(&self, key: &str) -> bool {
        self.objects.read().unwrap().contains_key(key)
    }

    /// Stored (still transport-encoded) content of an object.
    pub fn object_content(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap()
            .get(key)
            .map(|o| o.content.clone())
    }

    fn next_revision(&self) -> u64 {
        self.revision_counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn put_object(&self, key: &str, req: PutObjectRequest) -> Result<ObjectCreated> {
        {
            let poisoned = self.poisoned.read().unwrap();
            if poisoned.iter().any(|p| key.contains(p.as_str())) {
                return Err(GistlinkError::rate_limited("simulated rate limit"));
            }
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);

        let revision = format!("obj-{}", self.next_revision());
        let object = StoredObject {
            content: req.content,
            revision: revision.clone(),
        };
        self.objects
            .write()
            .unwrap()
            .insert(key.to_string(), object);

        Ok(ObjectCreated {
            download_url: format!("https://objects.invalid/{}/{}", req.branch, key),
            revision,
        })
    }

    async fn delete_object(&self, key: &str, req: DeleteObjectRequest) -> Result<()> {
        self.write_count.fetch_add(1, Ordering::SeqCst);

        let mut objects = self.objects.write().unwrap();
        match objects.get(key) {
            None => Err(GistlinkError::not_found(format!("no such object: {}", key))),
            Some(existing) if existing.revision != req.revision => Err(
                GistlinkError::concurrent_modification("object revision mismatch"),
            ),
            Some(_) => {
                objects.remove(key);
                Ok(())
            }
        }
    }

    async fn get_document(&self, id: &str) -> Result<VersionedDocument> {
        let documents = self.documents.read().unwrap();
        let doc = documents
            .get(id)
            .ok_or_else(|| GistlinkError::not_found(format!("no such document: {}", id)))?;

        Ok(VersionedDocument {
            content: doc.files.get(&self.primary_file).cloned().unwrap_or_default(),
            revision: doc.revision.to_string(),
        })
    }

    async fn patch_document(&self, id: &str, req: PatchDocumentRequest) -> Result<String> {
        let mut documents = self.documents.write().unwrap();

        // The entry is only created once the revision check has passed;
        // a rejected conditional write must not leave a phantom document
        // behind for later reads to find.
        match documents.get_mut(id) {
            Some(doc) => {
                if let Some(ref expected) = req.expected_revision {
                    if *expected != doc.revision.to_string() {
                        return Err(GistlinkError::concurrent_modification(format!(
                            "document at revision {}, write expected {}",
                            doc.revision, expected
                        )));
                    }
                }
                self.write_count.fetch_add(1, Ordering::SeqCst);
                doc.files.insert(req.file_name, req.content);
                doc.revision = self.next_revision();
                Ok(doc.revision.to_string())
            }
            None => {
                if req.expected_revision.is_some() {
                    return Err(GistlinkError::concurrent_modification(format!(
                        "conditional write against missing document: {}",
                        id
                    )));
                }
                self.write_count.fetch_add(1, Ordering::SeqCst);
                let mut doc = Document::default();
                doc.files.insert(req.file_name, req.content);
                doc.revision = self.next_revision();
                let revision = doc.revision.to_string();
                documents.insert(id.to_string(), doc);
                Ok(revision)
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Seeds an empty document so first reads see an empty table rather
/// than `NotFound`.
impl MemoryRemoteStore {
    pub async fn seed_document(&self, id: &str) {
        let file = self.primary_file.clone();
        let mut documents = self.documents.write().unwrap();
        let doc = documents.entry(id.to_string()).or_default();
        doc.files.entry(file).or_insert_with(|| "{}".to_string());
    }
}
