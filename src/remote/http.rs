//! HTTP implementation of [`RemoteStore`].
//!
//! Outbound calls go through a `ureq` agent with a global timeout and are
//! executed on the blocking thread pool. Failure classification is driven
//! by response status codes only; the remote's message text is carried
//! into the error for logging but never matched on.

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use ureq::Agent;

use super::{
    DeleteObjectRequest, ObjectCreated, PatchDocumentRequest, PutObjectRequest, RemoteStore,
    VersionedDocument,
};
use crate::config::RemoteConfig;
use crate::errors::{GistlinkError, Result};

/// Which API family a response came from; 413/422 means "content too
/// large" on the object routes but "malformed patch" on document routes.
#[derive(Debug, Clone, Copy)]
enum Route {
    Object,
    Document,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutObjectResponse {
    download_url: String,
    revision_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatchDocumentResponse {
    revision_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpRemoteStore {
    agent: Agent,
    api_base: String,
    token: String,
    namespace: String,
}

impl HttpRemoteStore {
    pub fn new(config: &RemoteConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_base: config.api_base.clone(),
            token: config.token.clone(),
            namespace: config.namespace.clone(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/objects/{}/{}", self.api_base, self.namespace, key)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/documents/{}", self.api_base, id)
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// `ETag: W/"abc123"` → `abc123`.
fn normalize_etag(raw: &str) -> String {
    raw.trim_start_matches("W/").trim_matches('"').to_string()
}

fn etag_of(resp: &ureq::http::Response<ureq::Body>) -> Option<String> {
    resp.headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .map(normalize_etag)
}

fn transport_error(err: ureq::Error) -> GistlinkError {
    match err {
        ureq::Error::Timeout(_) => GistlinkError::timeout("remote call timed out"),
        ureq::Error::Io(ref e) if e.kind() == ErrorKind::TimedOut => {
            GistlinkError::timeout("remote call timed out")
        }
        other => GistlinkError::network(other.to_string()),
    }
}

/// Maps a non-2xx response to the error taxonomy by status code.
fn classify_status(route: Route, status: u16, body: String) -> GistlinkError {
    let message = serde_json::from_str::<RemoteErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body);

    match status {
        401 => GistlinkError::unauthorized(message),
        403 | 429 => GistlinkError::rate_limited(message),
        404 => GistlinkError::not_found(message),
        412 => GistlinkError::concurrent_modification(message),
        413 | 422 => match route {
            Route::Object => GistlinkError::too_large(message),
            Route::Document => GistlinkError::validation(message),
        },
        _ => GistlinkError::network(format!("unexpected status {}: {}", status, message)),
    }
}

/// Splits a response into (status, etag, body text), consuming it.
fn read_response(resp: ureq::http::Response<ureq::Body>) -> Result<(u16, Option<String>, String)> {
    let status = resp.status().as_u16();
    let etag = etag_of(&resp);
    let body = resp
        .into_body()
        .read_to_string()
        .map_err(transport_error)?;
    Ok((status, etag, body))
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn put_object(&self, key: &str, req: PutObjectRequest) -> Result<ObjectCreated> {
        let this = self.clone();
        let url = self.object_url(key);

        tokio::task::spawn_blocking(move || {
            let resp = this
                .agent
                .put(&url)
                .header("Authorization", this.auth_header())
                .header("Accept", "application/json")
                .send_json(&req)
                .map_err(transport_error)?;

            let (status, _, body) = read_response(resp)?;
            if !(200..300).contains(&status) {
                return Err(classify_status(Route::Object, status, body));
            }

            let parsed: PutObjectResponse = serde_json::from_str(&body)?;
            Ok(ObjectCreated {
                download_url: parsed.download_url,
                revision: parsed.revision_id,
            })
        })
        .await
        .map_err(|e| GistlinkError::network(format!("blocking task failed: {}", e)))?
    }

    async fn delete_object(&self, key: &str, req: DeleteObjectRequest) -> Result<()> {
        let this = self.clone();
        let url = self.object_url(key);

        tokio::task::spawn_blocking(move || {
            // DELETE builds body-less by default; the remote expects the
            // revision and message in a JSON body.
            let resp = this
                .agent
                .delete(&url)
                .header("Authorization", this.auth_header())
                .force_send_body()
                .send_json(&req)
                .map_err(transport_error)?;

            let (status, _, body) = read_response(resp)?;
            if !(200..300).contains(&status) {
                return Err(classify_status(Route::Object, status, body));
            }
            Ok(())
        })
        .await
        .map_err(|e| GistlinkError::network(format!("blocking task failed: {}", e)))?
    }

    async fn get_document(&self, id: &str) -> Result<VersionedDocument> {
        let this = self.clone();
        let url = self.document_url(id);

        tokio::task::spawn_blocking(move || {
            let resp = this
                .agent
                .get(&url)
                .header("Authorization", this.auth_header())
                .call()
                .map_err(transport_error)?;

            let (status, etag, body) = read_response(resp)?;
            if !(200..300).contains(&status) {
                return Err(classify_status(Route::Document, status, body));
            }

            let revision = etag.ok_or_else(|| {
                GistlinkError::network("document response carried no ETag revision")
            })?;
            Ok(VersionedDocument {
                content: body,
                revision,
            })
        })
        .await
        .map_err(|e| GistlinkError::network(format!("blocking task failed: {}", e)))?
    }

    async fn patch_document(&self, id: &str, req: PatchDocumentRequest) -> Result<String> {
        let this = self.clone();
        let url = self.document_url(id);

        tokio::task::spawn_blocking(move || {
            let body = serde_json::json!({
                "files": { req.file_name.as_str(): { "content": req.content } }
            });

            let mut request = this
                .agent
                .patch(&url)
                .header("Authorization", this.auth_header())
                .header("Accept", "application/json");
            if let Some(ref revision) = req.expected_revision {
                request = request.header("If-Match", format!("\"{}\"", revision));
            }

            let resp = request.send_json(&body).map_err(transport_error)?;

            let (status, etag, text) = read_response(resp)?;
            if !(200..300).contains(&status) {
                if status == 412 {
                    warn!("conditional document write rejected, revision was stale");
                }
                return Err(classify_status(Route::Document, status, text));
            }

            // Prefer the ETag; some backends echo the revision in the body.
            if let Some(revision) = etag {
                return Ok(revision);
            }
            let parsed: PatchDocumentResponse = serde_json::from_str(&text)?;
            parsed.revision_id.ok_or_else(|| {
                GistlinkError::network("patch response carried no revision token")
            })
        })
        .await
        .map_err(|e| GistlinkError::network(format!("blocking task failed: {}", e)))?
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_etag() {
        assert_eq!(normalize_etag("\"abc123\""), "abc123");
        assert_eq!(normalize_etag("W/\"abc123\""), "abc123");
        assert_eq!(normalize_etag("abc123"), "abc123");
    }

    #[test]
    fn test_classify_status_codes() {
        let err = classify_status(Route::Object, 401, "{\"message\":\"bad token\"}".into());
        assert_eq!(err, GistlinkError::unauthorized("bad token"));

        assert!(matches!(
            classify_status(Route::Object, 403, String::new()),
            GistlinkError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(Route::Object, 429, String::new()),
            GistlinkError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(Route::Document, 404, String::new()),
            GistlinkError::NotFound(_)
        ));
        assert!(matches!(
            classify_status(Route::Document, 412, String::new()),
            GistlinkError::ConcurrentModification(_)
        ));
        assert!(matches!(
            classify_status(Route::Object, 500, String::new()),
            GistlinkError::Network(_)
        ));
    }

    // The same status means different things per route family.
    #[test]
    fn test_classify_413_per_route() {
        assert!(matches!(
            classify_status(Route::Object, 413, String::new()),
            GistlinkError::TooLarge(_)
        ));
        assert!(matches!(
            classify_status(Route::Object, 422, String::new()),
            GistlinkError::TooLarge(_)
        ));
        assert!(matches!(
            classify_status(Route::Document, 422, String::new()),
            GistlinkError::Validation(_)
        ));
    }

    // Message extraction falls back to the raw body for non-JSON errors.
    #[test]
    fn test_error_message_fallback() {
        let err = classify_status(Route::Object, 401, "plain text".into());
        assert_eq!(err.message(), "plain text");
    }

    #[test]
    fn test_url_shapes() {
        let config = RemoteConfig {
            api_base: "https://api.example.com".into(),
            token: "t".into(),
            namespace: "acme/cdn".into(),
            branch: "main".into(),
            document_id: "doc1".into(),
            document_file: "urls.json".into(),
            timeout_secs: 5,
        };
        let store = HttpRemoteStore::new(&config);
        assert_eq!(
            store.object_url("123-a_b.txt"),
            "https://api.example.com/objects/acme/cdn/123-a_b.txt"
        );
        assert_eq!(
            store.document_url("doc1"),
            "https://api.example.com/documents/doc1"
        );
    }
}
