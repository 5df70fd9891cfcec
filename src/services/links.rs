use std::sync::Arc;

use actix_web::web;
use serde::{Deserialize, Serialize};

use crate::errors::GistlinkError;
use crate::store::{CreatedLink, ShortLinkRecord, SlugStore};

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    pub slug: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub slug: String,
    pub original_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub click_count: u64,
}

impl From<ShortLinkRecord> for LinkResponse {
    fn from(record: ShortLinkRecord) -> Self {
        Self {
            slug: record.slug,
            original_url: record.original_url,
            created_at: record.created_at,
            click_count: record.click_count,
        }
    }
}

pub struct LinkService {}

impl LinkService {
    pub async fn create_link(
        req: web::Json<CreateLinkRequest>,
        store: web::Data<Arc<SlugStore>>,
    ) -> Result<web::Json<CreatedLink>, GistlinkError> {
        let req = req.into_inner();
        let created = store
            .create_short_link(&req.url, req.slug.as_deref())
            .await?;
        Ok(web::Json(created))
    }

    /// Lookup without click tracking.
    pub async fn get_link(
        path: web::Path<String>,
        store: web::Data<Arc<SlugStore>>,
    ) -> Result<web::Json<LinkResponse>, GistlinkError> {
        let record = store.resolve(&path.into_inner()).await?;
        Ok(web::Json(record.into()))
    }
}
