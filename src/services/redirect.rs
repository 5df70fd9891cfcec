use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use tracing::{debug, instrument};

use crate::errors::{GistlinkError, Result};
use crate::store::SlugStore;
use crate::store::clicks::ClickManager;

pub struct RedirectService {}

impl RedirectService {
    /// Looks up a slug and, when found, buffers a click for the
    /// background flusher. The click never blocks the caller; the
    /// destination comes back in one logical step.
    pub async fn resolve_and_track(
        store: &SlugStore,
        clicks: &ClickManager,
        slug: &str,
    ) -> Result<String> {
        let record = store.resolve(slug).await?;
        clicks.increment(slug);
        Ok(record.original_url)
    }

    #[instrument(skip(store, clicks), fields(slug = %path))]
    pub async fn handle_redirect(
        path: web::Path<String>,
        store: web::Data<Arc<SlugStore>>,
        clicks: web::Data<Arc<ClickManager>>,
    ) -> impl Responder {
        let slug = path.into_inner();
        if slug.is_empty() {
            return Self::not_found();
        }

        match Self::resolve_and_track(&store, &clicks, &slug).await {
            Ok(destination) => HttpResponse::TemporaryRedirect()
                .insert_header(("Location", destination))
                .finish(),
            Err(GistlinkError::NotFound(_)) => {
                debug!("redirect link not found: {}", slug);
                Self::not_found()
            }
            Err(e) => actix_web::ResponseError::error_response(&e),
        }
    }

    fn not_found() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Not Found")
    }
}
