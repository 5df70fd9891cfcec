use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// One entry in the slug mapping. Serde names follow the document
/// format already deployed in the wild, so existing tables parse as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortLinkRecord {
    #[serde(skip)]
    pub slug: String,
    #[serde(rename = "originalUrl")]
    pub original_url: String,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "clicks", default)]
    pub click_count: u64,
}

/// The whole slug mapping, stored as one remote document. A BTreeMap
/// keeps serialization order stable across rewrites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlugTable {
    entries: BTreeMap<String, ShortLinkRecord>,
}

impl SlugTable {
    /// Parses the raw document text. Blank content (a document that was
    /// just created) is an empty table, not an error.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut entries: BTreeMap<String, ShortLinkRecord> = serde_json::from_str(content)?;
        for (slug, record) in entries.iter_mut() {
            record.slug = slug.clone();
        }
        Ok(Self { entries })
    }

    pub fn to_document(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn get(&self, slug: &str) -> Option<&ShortLinkRecord> {
        self.entries.get(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.entries.contains_key(slug)
    }

    pub fn insert(&mut self, record: ShortLinkRecord) {
        self.entries.insert(record.slug.clone(), record);
    }

    /// Adds `count` clicks to `slug` if present; absent slugs are a
    /// no-op (the link may have been created from another session).
    pub fn add_clicks(&mut self, slug: &str, count: u64) -> bool {
        match self.entries.get_mut(slug) {
            Some(record) => {
                record.click_count += count;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
