//! Ratings backend client
//!
//! The backend is a black-box REST service holding collection definitions
//! and aggregate vote counts. Writes are plain query-string POSTs.

use async_trait::async_trait;
use mtgr_common::api::{CollectionsJson, RatingsGetResponse, RatingsPostQuery};
use tracing::debug;

use crate::error::{Error, Result};
use crate::http;

/// Remote ratings service
#[async_trait]
pub trait RatingsBackend: Send + Sync {
    /// `GET /collections`
    async fn get_collections(&self) -> Result<CollectionsJson>;

    /// `GET /ratings?collection_id=<id>`
    async fn get_ratings(&self, collection_id: &str) -> Result<RatingsGetResponse>;

    /// `POST /ratings?collection_id=&rating=&card_code=&set_code=&format_id=`
    async fn post_rating(&self, query: &RatingsPostQuery) -> Result<()>;
}

/// HTTP implementation of [`RatingsBackend`]
pub struct HttpRatingsBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpRatingsBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http_client: http::build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RatingsBackend for HttpRatingsBackend {
    #[tracing::instrument(skip(self))]
    async fn get_collections(&self) -> Result<CollectionsJson> {
        let url = format!("{}/collections", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        http::read_json(response, "collections").await
    }

    #[tracing::instrument(skip(self))]
    async fn get_ratings(&self, collection_id: &str) -> Result<RatingsGetResponse> {
        let url = format!("{}/ratings", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("collection_id", collection_id)])
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        http::read_json(response, &format!("ratings for {}", collection_id)).await
    }

    #[tracing::instrument(skip(self), fields(card = %query.identity(), format = %query.format_id))]
    async fn post_rating(&self, query: &RatingsPostQuery) -> Result<()> {
        let url = format!("{}/ratings", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        http::check_status(response, "rating write").await?;
        debug!("Rating write accepted");
        Ok(())
    }
}
