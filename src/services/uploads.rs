use std::sync::Arc;

use actix_web::{HttpResponse, web};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::{GistlinkError, Result};
use crate::upload::{UploadFile, UploadService, UploadedObject};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub name: String,
    pub content_type: String,
    /// Raw bytes, base64-encoded for the JSON body.
    pub content_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUploadRequest {
    pub revision: String,
}

/// Per-file outcome of a batch; either `object` or `error` is set.
#[derive(Debug, Serialize)]
pub struct BatchItemOutcome {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<UploadedObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchItemError>,
}

#[derive(Debug, Serialize)]
pub struct BatchItemError {
    pub code: &'static str,
    pub message: String,
}

fn decode(req: UploadRequest) -> Result<UploadFile> {
    let bytes = BASE64.decode(req.content_base64.as_bytes()).map_err(|e| {
        GistlinkError::validation(format!("invalid base64 content for {}: {}", req.name, e))
    })?;
    Ok(UploadFile {
        name: req.name,
        content_type: req.content_type,
        bytes: Bytes::from(bytes),
    })
}

pub struct UploadApiService {}

impl UploadApiService {
    pub async fn upload(
        req: web::Json<UploadRequest>,
        uploads: web::Data<Arc<UploadService>>,
    ) -> Result<web::Json<UploadedObject>> {
        let file = decode(req.into_inner())?;
        let object = uploads.upload(file).await?;
        Ok(web::Json(object))
    }

    /// Files are processed in submission order, never concurrently, and
    /// every file reports its own outcome.
    pub async fn upload_batch(
        req: web::Json<Vec<UploadRequest>>,
        uploads: web::Data<Arc<UploadService>>,
    ) -> Result<web::Json<Vec<BatchItemOutcome>>> {
        let mut files = Vec::with_capacity(req.len());
        for item in req.into_inner() {
            files.push(decode(item)?);
        }
        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();

        let results = uploads.upload_batch(files).await;
        let outcomes = names
            .into_iter()
            .zip(results)
            .map(|(name, result)| match result {
                Ok(object) => BatchItemOutcome {
                    name,
                    object: Some(object),
                    error: None,
                },
                Err(e) => BatchItemOutcome {
                    name,
                    object: None,
                    error: Some(BatchItemError {
                        code: e.code(),
                        message: e.format_simple(),
                    }),
                },
            })
            .collect();
        Ok(web::Json(outcomes))
    }

    pub async fn delete(
        path: web::Path<String>,
        req: web::Json<DeleteUploadRequest>,
        uploads: web::Data<Arc<UploadService>>,
    ) -> Result<HttpResponse> {
        uploads.delete(&path.into_inner(), &req.revision).await?;
        Ok(HttpResponse::NoContent().finish())
    }
}
