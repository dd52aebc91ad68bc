//! Collection filter
//!
//! Pure function of (catalog, filter config). The resulting view references
//! catalog entries by position and keeps their original relative order.

use mtgr_common::{CardIdentity, Color, FilterConfig};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry, ScryfallCard};

/// Filtered, ordered view over a shared catalog
#[derive(Debug, Clone)]
pub struct CatalogView {
    catalog: Arc<Catalog>,
    positions: Vec<usize>,
    filter_id: String,
}

impl CatalogView {
    /// Unfiltered view
    pub fn all(catalog: Arc<Catalog>) -> Self {
        let positions = (0..catalog.len()).collect();
        Self {
            catalog,
            positions,
            filter_id: FilterConfig::default().id(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Identity of the filter that produced this view
    pub fn filter_id(&self) -> &str {
        &self.filter_id
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Entry at a view index
    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        let position = *self.positions.get(index)?;
        self.catalog.entries().get(position)
    }

    pub fn identity_at(&self, index: usize) -> Option<&CardIdentity> {
        self.get(index).map(|e| &e.identity)
    }

    /// View index of a card, if it passed the filter
    pub fn index_of(&self, identity: &CardIdentity) -> Option<usize> {
        let position = self.catalog.position_of(identity)?;
        self.positions.binary_search(&position).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.positions
            .iter()
            .filter_map(move |p| self.catalog.entries().get(*p))
    }
}

/// Whether a card passes `config`
///
/// Rarity must be enabled (rarities without a toggle always pass) and at
/// least one color-identity letter must map to an enabled color. An empty
/// identity counts as colorless.
pub fn card_passes(card: &ScryfallCard, config: &FilterConfig) -> bool {
    if !config.rarity_enabled(card.rarity) {
        return false;
    }

    if card.color_identity.is_empty() {
        return config.color_enabled(Color::Colorless);
    }

    card.color_identity
        .iter()
        .filter_map(|letter| Color::from_letter(letter))
        .any(|color| config.color_enabled(color))
}

/// Derive the filtered view of `catalog`
pub fn filter_catalog(catalog: Arc<Catalog>, config: &FilterConfig) -> CatalogView {
    let positions: Vec<usize> = catalog
        .entries()
        .iter()
        .filter(|entry| card_passes(&entry.metadata, config))
        .map(|entry| entry.position)
        .collect();

    debug!(
        filter_id = %config.id(),
        total = catalog.len(),
        visible = positions.len(),
        "Filtered catalog"
    );

    CatalogView {
        catalog,
        positions,
        filter_id: config.id(),
    }
}
