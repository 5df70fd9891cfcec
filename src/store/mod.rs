//! Slug store: the read-modify-write cycle over the remote slug table.
//!
//! The whole table lives in one remote document, so every mutation is a
//! fetch, an in-memory edit, and a conditional write-back. The write is
//! conditioned on the revision the table was read at; losing the race
//! retries the entire cycle a bounded number of times. Nothing holds a
//! table copy across the cycle boundary; each attempt reads fresh.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::errors::{GistlinkError, Result};
use crate::remote::{PatchDocumentRequest, RemoteStore};

pub mod clicks;
pub mod models;

pub use models::{ShortLinkRecord, SlugTable};

/// Bounded retries for the conditional-write cycle.
const CAS_MAX_RETRIES: usize = 3;

/// Length of generated slugs, cut from a v4 unique id.
pub const GENERATED_SLUG_LEN: usize = 8;

/// Schemes that must never become redirect targets.
const DANGEROUS_SCHEMES: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// Outcome of a successful create; carries the record fields plus the
/// ready-to-share short URL. The record's slug is keyed, not embedded,
/// in the document, so the API shape spells it out explicitly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLink {
    pub slug: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub click_count: u64,
}

/// A custom slug may only contain `[A-Za-z0-9_-]`.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn generate_slug() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..GENERATED_SLUG_LEN].to_string()
}

/// Explicit URL validation; the original left this to the browser.
pub fn validate_url(url: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        return Err(GistlinkError::validation("URL cannot be empty"));
    }

    let lower = url.to_lowercase();
    for scheme in DANGEROUS_SCHEMES {
        if lower.starts_with(scheme) {
            return Err(GistlinkError::validation(format!(
                "blocked scheme: {}",
                scheme
            )));
        }
    }
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(GistlinkError::validation(
            "URL must start with http:// or https://",
        ));
    }
    Url::parse(url)
        .map_err(|e| GistlinkError::validation(format!("invalid URL format: {}", e)))?;
    Ok(())
}

pub struct SlugStore {
    remote: Arc<dyn RemoteStore>,
    document_id: String,
    document_file: String,
    public_origin: String,
}

impl SlugStore {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        document_id: &str,
        document_file: &str,
        public_origin: &str,
    ) -> Self {
        Self {
            remote,
            document_id: document_id.to_string(),
            document_file: document_file.to_string(),
            public_origin: public_origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn short_url(&self, slug: &str) -> String {
        format!("{}/r/{}", self.public_origin, slug)
    }

    async fn load_table(&self) -> Result<(SlugTable, String)> {
        let document = self.remote.get_document(&self.document_id).await?;
        let table = SlugTable::parse(&document.content)?;
        Ok((table, document.revision))
    }

    async fn write_table(&self, table: &SlugTable, expected_revision: String) -> Result<String> {
        self.remote
            .patch_document(
                &self.document_id,
                PatchDocumentRequest {
                    file_name: self.document_file.clone(),
                    content: table.to_document()?,
                    expected_revision: Some(expected_revision),
                },
            )
            .await
    }

    /// Creates a new short link. A requested slug that is already taken
    /// fails with `SlugTaken` without writing; a lost conditional write
    /// retries the whole read-modify-write cycle.
    #[instrument(skip(self))]
    pub async fn create_short_link(
        &self,
        original_url: &str,
        requested_slug: Option<&str>,
    ) -> Result<CreatedLink> {
        validate_url(original_url)?;
        if let Some(slug) = requested_slug {
            if !is_valid_slug(slug) {
                return Err(GistlinkError::validation(format!(
                    "invalid slug {:?}: only letters, digits, '-' and '_' are allowed",
                    slug
                )));
            }
        }

        for attempt in 0..CAS_MAX_RETRIES {
            let (mut table, revision) = self.load_table().await?;

            let slug = match requested_slug {
                Some(requested) => {
                    if table.contains(requested) {
                        return Err(GistlinkError::slug_taken(format!(
                            "slug already in use: {}",
                            requested
                        )));
                    }
                    requested.to_string()
                }
                None => {
                    let mut candidate = generate_slug();
                    while table.contains(&candidate) {
                        candidate = generate_slug();
                    }
                    candidate
                }
            };

            let record = ShortLinkRecord {
                slug: slug.clone(),
                original_url: original_url.to_string(),
                created_at: chrono::Utc::now(),
                click_count: 0,
            };
            table.insert(record.clone());

            match self.write_table(&table, revision).await {
                Ok(_) => {
                    debug!("created short link {} -> {}", slug, original_url);
                    return Ok(CreatedLink {
                        short_url: self.short_url(&slug),
                        slug: record.slug,
                        original_url: record.original_url,
                        created_at: record.created_at,
                        click_count: record.click_count,
                    });
                }
                Err(GistlinkError::ConcurrentModification(_)) => {
                    debug!(
                        "table changed under create of {}, retry {}/{}",
                        slug,
                        attempt + 1,
                        CAS_MAX_RETRIES
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(GistlinkError::concurrent_modification(format!(
            "table kept changing, gave up after {} attempts",
            CAS_MAX_RETRIES
        )))
    }

    /// Read-only lookup; never writes.
    pub async fn resolve(&self, slug: &str) -> Result<ShortLinkRecord> {
        let (table, _) = self.load_table().await?;
        table
            .get(slug)
            .cloned()
            .ok_or_else(|| GistlinkError::not_found(format!("unknown slug: {}", slug)))
    }

    /// Folds buffered click counts into the table in one conditional
    /// write cycle. Slugs no longer present are skipped; if nothing
    /// matched, no write is issued.
    pub async fn apply_clicks(&self, updates: &[(String, u64)]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        for _ in 0..CAS_MAX_RETRIES {
            let (mut table, revision) = self.load_table().await?;

            let mut touched = false;
            for (slug, count) in updates {
                touched |= table.add_clicks(slug, *count);
            }
            if !touched {
                return Ok(());
            }

            match self.write_table(&table, revision).await {
                Ok(_) => return Ok(()),
                Err(GistlinkError::ConcurrentModification(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(GistlinkError::concurrent_modification(
            "click update kept losing the write race",
        ))
    }

    /// Best-effort single click. Click tracking is telemetry, not
    /// correctness: failures are logged and swallowed.
    pub async fn increment_click(&self, slug: &str) {
        if let Err(e) = self.apply_clicks(&[(slug.to_string(), 1)]).await {
            warn!("click increment for {} dropped: {}", slug, e);
        }
    }
}
