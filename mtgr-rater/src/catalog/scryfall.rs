//! Scryfall card API client
//!
//! Paginated card search plus single-card lookup, rate limited so page
//! requests are spaced by a minimum interval.

use async_trait::async_trait;
use mtgr_common::{CardIdentity, Rarity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{CardLookup, CardPage, CardSource, PageRequest};
use crate::error::{Error, Result};
use crate::http;

/// Image URIs of a card or card face; only the "normal" size is used
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
}

/// One face of a multi-faced card
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CardFace {
    pub name: String,
    pub mana_cost: Option<String>,
    pub image_uris: Option<ImageUris>,
}

/// Card object as returned by the card API
///
/// Only the fields the rater uses are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScryfallCard {
    /// Set code
    pub set: String,
    /// Collector number within the set
    pub collector_number: String,
    pub name: String,
    pub rarity: Rarity,
    /// Absent on some multi-faced cards
    pub colors: Option<Vec<String>>,
    pub color_identity: Vec<String>,
    pub mana_cost: Option<String>,
    pub type_line: Option<String>,
    /// Present for single-image cards
    pub image_uris: Option<ImageUris>,
    /// Present for cards with an image per face
    pub card_faces: Option<Vec<CardFace>>,
}

impl ScryfallCard {
    pub fn identity(&self) -> CardIdentity {
        CardIdentity::new(self.set.clone(), self.collector_number.clone())
    }
}

/// List object wrapping one page of search results
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct ScryfallList {
    data: Vec<ScryfallCard>,
    has_more: bool,
    next_page: Option<String>,
}

/// Spaces card API requests at least `interval` apart
struct RequestSpacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestSpacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Hold the caller until its slot; slots are handed out in lock order
    async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;

        if let Some(slot) = *next_slot {
            let now = Instant::now();
            if slot > now {
                tracing::debug!(wait_ms = (slot - now).as_millis() as u64, "Spacing card API request");
                tokio::time::sleep_until(slot).await;
            }
        }

        *next_slot = Some(Instant::now() + self.interval);
    }
}

/// Card API client
pub struct ScryfallClient {
    http_client: reqwest::Client,
    base_url: String,
    spacer: Arc<RequestSpacer>,
}

impl ScryfallClient {
    pub fn new(base_url: &str, page_interval: Duration) -> Result<Self> {
        Ok(Self {
            http_client: http::build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            spacer: Arc::new(RequestSpacer::new(page_interval)),
        })
    }

    /// First-page URL for a collection query
    ///
    /// `query` is already URL-encoded (it comes from the collections list).
    /// Digital-only printings are excluded and results come in set order.
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/cards/search?q=-is%3Adigital+{}&order=set&unique=cards",
            self.base_url, query
        )
    }

    /// URL of a single printing in a given language
    pub fn card_url(&self, identity: &CardIdentity, language: &str) -> String {
        format!(
            "{}/cards/{}/{}/{}",
            self.base_url, identity.set_code, identity.card_code, language
        )
    }

    async fn get_list(&self, url: &str) -> Result<ScryfallList> {
        self.spacer.acquire().await;

        tracing::debug!(url = %url, "Querying card API");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        http::read_json(response, url).await
    }

    /// Lookup one printing, e.g. for localized art
    #[tracing::instrument(skip(self))]
    pub async fn card(&self, identity: &CardIdentity, language: &str) -> Result<ScryfallCard> {
        self.spacer.acquire().await;

        let url = self.card_url(identity, language);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        http::read_json(response, &url).await
    }
}

/// Turn a fetched list into a page
///
/// The search endpoint answers 404 when nothing matches, so a missing first
/// page is an empty result. A missing continuation page is still an error.
fn page_from(request: &PageRequest, fetched: Result<ScryfallList>) -> Result<CardPage> {
    match fetched {
        Ok(list) => Ok(CardPage {
            cards: list.data,
            has_more: list.has_more,
            next_page: list.next_page,
        }),
        Err(Error::NotFound(url)) if matches!(request, PageRequest::Query(_)) => {
            tracing::info!(url = %url, "Query matched no cards");
            Ok(CardPage::default())
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl CardSource for ScryfallClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<CardPage> {
        let url = match request {
            PageRequest::Query(query) => self.search_url(query),
            PageRequest::Cursor(next) => next.clone(),
        };

        page_from(request, self.get_list(&url).await)
    }
}

#[async_trait]
impl CardLookup for ScryfallClient {
    async fn lookup_card(&self, identity: &CardIdentity, language: &str) -> Result<ScryfallCard> {
        self.card(identity, language).await
    }
}
