//! Query template catalog.
//!
//! The catalog is derived from a fixed in-process definition every time it
//! is loaded. Ids are positions in that list; the SHA-512 content hash is
//! the identity that survives reordering.

mod templates;

use crate::error::CatalogError;
use crate::models::{AnalyticsKey, QueryTemplate};
use sha2::{Digest, Sha512};
use tracing::debug;

pub use templates::{RawTemplate, RAW_TEMPLATES};

/// Hex-encoded SHA-512 digest of a template's text.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha512::new().chain_update(text.as_bytes()).finalize())
}

/// An ordered, read-only list of query templates.
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: Vec<QueryTemplate>,
}

impl Catalog {
    /// Derive the catalog from the built-in template definitions.
    pub fn load() -> Self {
        Self::from_raw(RAW_TEMPLATES)
    }

    /// Derive a catalog from an arbitrary template list.
    pub fn from_raw(raw: &[RawTemplate]) -> Self {
        let templates = raw
            .iter()
            .enumerate()
            .map(|(id, entry)| {
                let mut param_names: Vec<String> = Vec::with_capacity(entry.params.len());
                for name in entry.params {
                    if !param_names.iter().any(|p| p == name) {
                        param_names.push(name.to_string());
                    }
                }

                QueryTemplate {
                    id,
                    content_hash: content_hash(entry.text),
                    level: entry.level,
                    param_names,
                    text: entry.text.to_string(),
                    description: entry.description.to_string(),
                    analytics_key: entry.analytics,
                }
            })
            .collect::<Vec<_>>();

        debug!("Catalog derived with {} templates", templates.len());
        Self { templates }
    }

    /// All templates in catalog order.
    pub fn list(&self) -> &[QueryTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Resolve a user-supplied id string to a template.
    ///
    /// Surrounding whitespace is ignored. Anything that is not a
    /// non-negative integer is `InvalidId`; an integer past the end is
    /// `OutOfRange`.
    pub fn get_by_index(&self, raw_id: &str) -> Result<&QueryTemplate, CatalogError> {
        let index: usize = raw_id
            .trim()
            .parse()
            .map_err(|_| CatalogError::InvalidId(raw_id.to_string()))?;

        self.templates.get(index).ok_or(CatalogError::OutOfRange {
            index,
            len: self.templates.len(),
        })
    }

    /// Look up a template by its full content hash.
    pub fn find_by_hash(&self, hash: &str) -> Option<&QueryTemplate> {
        let hash = hash.trim().to_lowercase();
        self.templates.iter().find(|t| t.content_hash == hash)
    }

    /// The first template whose result shape feeds the given reduction.
    pub fn find_by_analytics_key(&self, key: AnalyticsKey) -> Option<&QueryTemplate> {
        self.templates.iter().find(|t| t.analytics_key == Some(key))
    }
}
