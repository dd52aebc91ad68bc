//! Test doubles for mtgr-rater integration tests
//!
//! - FakeCardSource: paged card API answering from memory
//! - FakeBackend: ratings service recording every POST
//! - GatedResolver: art resolver whose lookups finish only when released
//! - LocalizedResolver: art resolver answering with its own image host
//! - PanickingResolver: art resolver that panics on every lookup
//! - RecordingPrefetcher: remembers every prefetched URI

#![allow(dead_code)]

use async_trait::async_trait;
use mtgr_common::api::{
    CardRatingsResponse, CollectionInfo, CollectionsJson, RatingsGetResponse, RatingsPostQuery,
    SchemaRatings,
};
use mtgr_common::events::EventBus;
use mtgr_common::{CardIdentity, Rarity};
use mtgr_rater::backend::RatingsBackend;
use mtgr_rater::catalog::{CardPage, CardSource, CatalogEntry, ImageUris, PageRequest, ScryfallCard};
use mtgr_rater::navigation::{ArtResolver, CatalogArtResolver, NavigationDeps, NoopPrefetcher, Prefetcher};
use mtgr_rater::store::LocalRatingStore;
use mtgr_rater::{CollectionLoader, Error, RaterSession, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const COLLECTION: &str = "otj";
pub const FORMATS: [&str; 2] = ["limited", "standard"];

pub fn image_uri(set: &str, number: &str) -> String {
    format!("https://img.test/{}/{}.jpg", set, number)
}

/// Single-faced card with a "normal" image
pub fn card(set: &str, number: &str, name: &str, rarity: Rarity, color_identity: &[&str]) -> ScryfallCard {
    ScryfallCard {
        set: set.to_string(),
        collector_number: number.to_string(),
        name: name.to_string(),
        rarity,
        color_identity: color_identity.iter().map(|c| c.to_string()).collect(),
        image_uris: Some(ImageUris {
            normal: Some(image_uri(set, number)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `count` common white cards of set "otj", numbered from 1
pub fn plain_cards(count: usize) -> Vec<ScryfallCard> {
    (1..=count)
        .map(|n| card("otj", &n.to_string(), &format!("Card {}", n), Rarity::Common, &["W"]))
        .collect()
}

// ========================================
// Card source
// ========================================

/// Serves fixed pages; continuation cursors are "page-<n>"
pub struct FakeCardSource {
    pages: Vec<CardPage>,
    fail_page: Option<usize>,
    requests: Mutex<Vec<PageRequest>>,
}

impl FakeCardSource {
    /// Split `cards` into pages of `per_page`
    pub fn paged(cards: Vec<ScryfallCard>, per_page: usize) -> Self {
        let chunks: Vec<Vec<ScryfallCard>> = cards
            .chunks(per_page.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();
        let total = chunks.len();
        let pages = chunks
            .into_iter()
            .enumerate()
            .map(|(i, cards)| {
                let has_more = i + 1 < total;
                CardPage {
                    cards,
                    has_more,
                    next_page: has_more.then(|| format!("page-{}", i + 1)),
                }
            })
            .collect();
        Self {
            pages,
            fail_page: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single(cards: Vec<ScryfallCard>) -> Self {
        let per_page = cards.len();
        Self::paged(cards, per_page)
    }

    /// Answer page `index` (0-based) with a server error
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_page = Some(index);
        self
    }

    /// Page `index` still claims more cards but carries no cursor
    pub fn without_cursor_at(mut self, index: usize) -> Self {
        if let Some(page) = self.pages.get_mut(index) {
            page.has_more = true;
            page.next_page = None;
        }
        self
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CardSource for FakeCardSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<CardPage> {
        self.requests.lock().unwrap().push(request.clone());

        let index = match request {
            PageRequest::Query(_) => 0,
            PageRequest::Cursor(cursor) => cursor
                .strip_prefix("page-")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| Error::NotFound(cursor.clone()))?,
        };
        if self.fail_page == Some(index) {
            return Err(Error::Api(500, "card api unavailable".to_string()));
        }
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}

// ========================================
// Ratings backend
// ========================================

pub struct FakeBackend {
    collections: CollectionsJson,
    ratings: Vec<CardRatingsResponse>,
    fail_ratings: bool,
    fail_posts: AtomicBool,
    posts: Mutex<Vec<RatingsPostQuery>>,
}

impl FakeBackend {
    /// One collection "otj" with formats "limited" and "standard"
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            COLLECTION.to_string(),
            CollectionInfo {
                title: "Outlaws".to_string(),
                scryfall_query: "set%3Aotj".to_string(),
                set_order: vec!["otj".to_string()],
                releasing: false,
            },
        );
        Self {
            collections: CollectionsJson {
                latest: COLLECTION.to_string(),
                formats: FORMATS.iter().map(|f| f.to_string()).collect(),
                entries,
            },
            ratings: Vec::new(),
            fail_ratings: false,
            fail_posts: AtomicBool::new(false),
            posts: Mutex::new(Vec::new()),
        }
    }

    /// Server-side counts for one (card, format)
    pub fn with_counts(mut self, identity: &CardIdentity, format_id: &str, counts: [u32; 5]) -> Self {
        let row = SchemaRatings {
            format_id: format_id.to_string(),
            set_code: identity.set_code.clone(),
            card_code: identity.card_code.clone(),
            rated_1: counts[0],
            rated_2: counts[1],
            rated_3: counts[2],
            rated_4: counts[3],
            rated_5: counts[4],
        };
        match self.ratings.iter_mut().find(|r| r.identity() == *identity) {
            Some(existing) => {
                existing.rating_by_format.insert(format_id.to_string(), row);
            }
            None => {
                let mut rating_by_format = HashMap::new();
                rating_by_format.insert(format_id.to_string(), row);
                self.ratings.push(CardRatingsResponse {
                    set_code: identity.set_code.clone(),
                    card_code: identity.card_code.clone(),
                    rating_by_format,
                });
            }
        }
        self
    }

    pub fn failing_ratings(mut self) -> Self {
        self.fail_ratings = true;
        self
    }

    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn posts(&self) -> Vec<RatingsPostQuery> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RatingsBackend for FakeBackend {
    async fn get_collections(&self) -> Result<CollectionsJson> {
        Ok(self.collections.clone())
    }

    async fn get_ratings(&self, collection_id: &str) -> Result<RatingsGetResponse> {
        if self.fail_ratings {
            return Err(Error::Network("connection refused".to_string()));
        }
        Ok(RatingsGetResponse {
            collection_id: collection_id.to_string(),
            collection_info: self
                .collections
                .entries
                .get(collection_id)
                .cloned()
                .unwrap_or_default(),
            ratings: self.ratings.clone(),
        })
    }

    async fn post_rating(&self, query: &RatingsPostQuery) -> Result<()> {
        self.posts.lock().unwrap().push(query.clone());
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(Error::Api(503, "backend down".to_string()));
        }
        Ok(())
    }
}

// ========================================
// Navigation collaborators
// ========================================

/// Resolves catalog art, holding gated cards until released
#[derive(Default)]
pub struct GatedResolver {
    gates: Mutex<HashMap<CardIdentity, watch::Sender<bool>>>,
}

impl GatedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(&self, identity: &CardIdentity) {
        self.gates
            .lock()
            .unwrap()
            .insert(identity.clone(), watch::channel(false).0);
    }

    /// Let every pending and later lookup of `identity` finish
    pub fn release(&self, identity: &CardIdentity) {
        if let Some(gate) = self.gates.lock().unwrap().get(identity) {
            gate.send_replace(true);
        }
    }
}

#[async_trait]
impl ArtResolver for GatedResolver {
    async fn resolve(&self, entry: &CatalogEntry) -> Result<Vec<String>> {
        let gate = self.gates.lock().unwrap().get(&entry.identity).map(|g| g.subscribe());
        if let Some(mut open) = gate {
            while !*open.borrow() {
                if open.changed().await.is_err() {
                    break;
                }
            }
        }
        Ok(entry.art.uris())
    }
}

pub fn localized_uri(identity: &CardIdentity) -> String {
    format!("https://localized.test/{}", identity)
}

/// Answers every card with `localized_uri`, counting lookups
#[derive(Default)]
pub struct LocalizedResolver {
    lookups: Mutex<Vec<CardIdentity>>,
}

impl LocalizedResolver {
    pub fn lookups(&self) -> Vec<CardIdentity> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtResolver for LocalizedResolver {
    async fn resolve(&self, entry: &CatalogEntry) -> Result<Vec<String>> {
        self.lookups.lock().unwrap().push(entry.identity.clone());
        Ok(vec![localized_uri(&entry.identity)])
    }
}

pub struct PanickingResolver;

#[async_trait]
impl ArtResolver for PanickingResolver {
    async fn resolve(&self, entry: &CatalogEntry) -> Result<Vec<String>> {
        panic!("resolver blew up on {}", entry.identity);
    }
}

#[derive(Default)]
pub struct RecordingPrefetcher {
    uris: Mutex<Vec<String>>,
}

impl RecordingPrefetcher {
    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prefetcher for RecordingPrefetcher {
    async fn prefetch(&self, uri: &str) {
        self.uris.lock().unwrap().push(uri.to_string());
    }
}

pub fn deps_with(
    resolver: Arc<dyn ArtResolver>,
    prefetcher: Arc<dyn Prefetcher>,
    events: &EventBus,
) -> NavigationDeps {
    NavigationDeps {
        resolver,
        prefetcher,
        events: events.clone(),
        preview_delay: Duration::from_millis(300),
    }
}

pub fn default_deps(events: &EventBus) -> NavigationDeps {
    deps_with(Arc::new(CatalogArtResolver), Arc::new(NoopPrefetcher), events)
}

/// Session over in-memory fakes with catalog art and no prefetching
pub fn session_with(
    source: FakeCardSource,
    backend: Arc<FakeBackend>,
    store: Arc<LocalRatingStore>,
    events: &EventBus,
) -> RaterSession {
    let loader = CollectionLoader::new(Arc::new(source), backend, store, events.clone());
    RaterSession::new(loader, default_deps(events))
}

/// Let spawned tasks run on the current-thread test runtime
pub async fn run_pending_tasks() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
