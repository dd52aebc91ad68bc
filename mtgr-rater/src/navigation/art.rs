//! Image resolution for displayed cards

use async_trait::async_trait;
use mtgr_common::CardIdentity;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::catalog::{CardArt, CardLookup, CatalogEntry};
use crate::error::Result;

/// Turns a catalog entry into the image URIs to display
///
/// One URI for single-faced cards, front then back for multi-faced ones.
#[async_trait]
pub trait ArtResolver: Send + Sync {
    async fn resolve(&self, entry: &CatalogEntry) -> Result<Vec<String>>;
}

/// Uses the art captured in the catalog
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogArtResolver;

#[async_trait]
impl ArtResolver for CatalogArtResolver {
    async fn resolve(&self, entry: &CatalogEntry) -> Result<Vec<String>> {
        Ok(entry.art.uris())
    }
}

/// Looks up the printing in another language, falling back to catalog art
///
/// Results are remembered so revisiting a card (or prefetching it) doesn't
/// repeat the lookup.
pub struct LocalizedArtResolver {
    lookup: Arc<dyn CardLookup>,
    language: String,
    resolved: Mutex<HashMap<CardIdentity, Vec<String>>>,
}

impl LocalizedArtResolver {
    pub fn new(lookup: Arc<dyn CardLookup>, language: impl Into<String>) -> Self {
        Self {
            lookup,
            language: language.into(),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    fn remembered(&self, identity: &CardIdentity) -> Option<Vec<String>> {
        self.resolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(identity)
            .cloned()
    }
}

#[async_trait]
impl ArtResolver for LocalizedArtResolver {
    async fn resolve(&self, entry: &CatalogEntry) -> Result<Vec<String>> {
        if let Some(uris) = self.remembered(&entry.identity) {
            return Ok(uris);
        }

        let uris = match self.lookup.lookup_card(&entry.identity, &self.language).await {
            Ok(card) => CardArt::from_card(&card).uris(),
            Err(e) => {
                warn!(
                    card = %entry.identity,
                    language = %self.language,
                    error = %e,
                    "Localized art unavailable, using catalog art"
                );
                return Ok(entry.art.uris());
            }
        };

        debug!(card = %entry.identity, language = %self.language, "Resolved localized art");
        self.resolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(entry.identity.clone(), uris.clone());
        Ok(uris)
    }
}

/// Resolver for a configured language; English uses the catalog directly
pub fn resolver_for_language(lookup: Arc<dyn CardLookup>, language: &str) -> Arc<dyn ArtResolver> {
    if language.is_empty() || language.eq_ignore_ascii_case("en") {
        Arc::new(CatalogArtResolver)
    } else {
        Arc::new(LocalizedArtResolver::new(lookup, language))
    }
}
