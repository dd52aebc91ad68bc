//! Card catalog resolution
//!
//! Follows the card API's page cursor until exhausted and builds one ordered
//! sequence plus an identity lookup table in the same pass. A failed page
//! aborts the whole resolution: callers never see a partial catalog.

mod scryfall;

pub use scryfall::{CardFace, ImageUris, ScryfallCard, ScryfallClient};

use async_trait::async_trait;
use mtgr_common::api::CollectionInfo;
use mtgr_common::CardIdentity;
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::error::{Error, Result};

/// Shown when the card API gives no usable image
pub const PLACEHOLDER_IMAGE: &str =
    "https://cards.scryfall.io/normal/front/5/a/5aa90ab6-2686-4462-8725-5d4370c05437.jpg?1663738897";

/// Which page to fetch next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// First page of a collection query
    Query(String),
    /// Continuation URL from the previous page
    Cursor(String),
}

/// One page of cards
#[derive(Debug, Clone, Default)]
pub struct CardPage {
    pub cards: Vec<ScryfallCard>,
    pub has_more: bool,
    pub next_page: Option<String>,
}

/// Paginated source of card metadata
#[async_trait]
pub trait CardSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<CardPage>;
}

/// Single-printing lookup, used for art in another language
#[async_trait]
pub trait CardLookup: Send + Sync {
    async fn lookup_card(&self, identity: &CardIdentity, language: &str) -> Result<ScryfallCard>;
}

/// Card art, decided once when the catalog is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardArt {
    SingleFaced { uri: String },
    /// Front first, then back
    MultiFaced { uris: Vec<String> },
}

impl CardArt {
    /// Classify a card's image payload
    ///
    /// Top-level `image_uris` wins over per-face images; a card with neither
    /// gets the placeholder and an error log.
    pub fn from_card(card: &ScryfallCard) -> Self {
        if let Some(uris) = &card.image_uris {
            return CardArt::SingleFaced {
                uri: uris
                    .normal
                    .clone()
                    .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            };
        }

        if let Some(faces) = card.card_faces.as_ref().filter(|f| !f.is_empty()) {
            return CardArt::MultiFaced {
                uris: faces
                    .iter()
                    .map(|face| {
                        face.image_uris
                            .as_ref()
                            .and_then(|u| u.normal.clone())
                            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string())
                    })
                    .collect(),
            };
        }

        error!(
            set = %card.set,
            collector_number = %card.collector_number,
            "Card had neither card_faces nor image_uris"
        );
        CardArt::SingleFaced {
            uri: PLACEHOLDER_IMAGE.to_string(),
        }
    }

    /// Image shown first
    pub fn front(&self) -> &str {
        match self {
            CardArt::SingleFaced { uri } => uri,
            CardArt::MultiFaced { uris } => uris.first().map(String::as_str).unwrap_or(PLACEHOLDER_IMAGE),
        }
    }

    pub fn uris(&self) -> Vec<String> {
        match self {
            CardArt::SingleFaced { uri } => vec![uri.clone()],
            CardArt::MultiFaced { uris } => uris.clone(),
        }
    }

    pub fn is_multi_faced(&self) -> bool {
        matches!(self, CardArt::MultiFaced { uris } if uris.len() > 1)
    }
}

/// One card of a resolved collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub identity: CardIdentity,
    /// Position in the catalog's ordered sequence
    pub position: usize,
    /// Opaque payload from the card API
    pub metadata: ScryfallCard,
    pub art: CardArt,
}

/// Ordered cards of a collection with identity lookup
///
/// Immutable once built; views and navigation hold it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<CardIdentity, usize>,
}

impl Catalog {
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, identity: &CardIdentity) -> Option<&CatalogEntry> {
        self.index.get(identity).map(|i| &self.entries[*i])
    }

    pub fn position_of(&self, identity: &CardIdentity) -> Option<usize> {
        self.index.get(identity).copied()
    }

    pub fn contains(&self, identity: &CardIdentity) -> bool {
        self.index.contains_key(identity)
    }

    pub fn identities(&self) -> impl Iterator<Item = &CardIdentity> {
        self.entries.iter().map(|e| &e.identity)
    }

    pub fn from_cards(cards: impl IntoIterator<Item = ScryfallCard>) -> Self {
        let mut builder = CatalogBuilder::default();
        for card in cards {
            builder.push(card);
        }
        builder.finish()
    }
}

/// Accumulates the sequence and the lookup table together
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    /// Append a card; returns false (and drops it) for a repeated identity
    pub fn push(&mut self, card: ScryfallCard) -> bool {
        let identity = card.identity();
        if self.catalog.index.contains_key(&identity) {
            warn!(card = %identity, "Duplicate card in catalog, keeping first");
            return false;
        }

        let position = self.catalog.entries.len();
        let art = CardArt::from_card(&card);
        self.catalog.index.insert(identity.clone(), position);
        self.catalog.entries.push(CatalogEntry {
            identity,
            position,
            metadata: card,
            art,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn finish(self) -> Catalog {
        self.catalog
    }
}

/// Fetch every page of a collection's query into a catalog
pub async fn resolve_catalog(source: &dyn CardSource, info: &CollectionInfo) -> Result<Catalog> {
    let mut builder = CatalogBuilder::default();
    let mut request = PageRequest::Query(info.scryfall_query.clone());
    let mut pages = 0usize;

    loop {
        let page = source.fetch_page(&request).await.map_err(|e| {
            Error::Catalog(format!(
                "page {} of '{}' failed: {}",
                pages + 1,
                info.title,
                e
            ))
        })?;
        pages += 1;

        for card in page.cards {
            builder.push(card);
        }

        if !page.has_more {
            break;
        }
        match page.next_page {
            Some(next) => request = PageRequest::Cursor(next),
            None => {
                return Err(Error::Catalog(format!(
                    "page {} of '{}' reported more cards without a cursor",
                    pages, info.title
                )));
            }
        }
    }

    info!(
        title = %info.title,
        pages,
        cards = builder.len(),
        "Resolved catalog"
    );

    Ok(builder.finish())
}

/// Stable reorder grouping cards by their set's position in `set_order`
///
/// Sets missing from `set_order` follow, in their existing order. An empty
/// `set_order` leaves the catalog untouched.
pub fn reorder_by_set_order(catalog: Catalog, set_order: &[String]) -> Catalog {
    if set_order.is_empty() {
        return catalog;
    }

    let rank = |set_code: &str| {
        set_order
            .iter()
            .position(|s| s.eq_ignore_ascii_case(set_code))
            .unwrap_or(set_order.len())
    };

    let mut entries = catalog.entries;
    entries.sort_by_key(|e| rank(&e.identity.set_code));

    let mut builder = CatalogBuilder::default();
    for entry in entries {
        builder.push(entry.metadata);
    }
    builder.finish()
}
