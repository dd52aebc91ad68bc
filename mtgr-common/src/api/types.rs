//! Request/response types for the ratings backend

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{CardIdentity, CardRatings, RatingAggregate, RatingValue};

// ========================================
// Collections
// ========================================

/// One collection definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionInfo {
    /// Display title
    pub title: String,
    /// Card API query selecting the collection's cards (already URL-encoded)
    pub scryfall_query: String,
    /// Optional explicit set order, e.g. `["otj", "otp", "big"]`
    pub set_order: Vec<String>,
    /// Whether the collection is still being released
    pub releasing: bool,
}

/// Response of `GET /collections`
///
/// # Examples
///
/// ```
/// use mtgr_common::api::CollectionsJson;
///
/// let json = r#"{
///     "latest": "otj",
///     "formats": ["limited", "cube"],
///     "entries": { "otj": { "title": "Outlaws", "scryfall_query": "set%3Aotj" } }
/// }"#;
/// let collections: CollectionsJson = serde_json::from_str(json).unwrap();
/// assert_eq!(collections.latest, "otj");
/// assert!(collections.entries["otj"].set_order.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionsJson {
    /// Default collection id
    pub latest: String,
    /// Every format the backend tracks
    pub formats: Vec<String>,
    /// Collection id → definition
    pub entries: HashMap<String, CollectionInfo>,
}

// ========================================
// Ratings
// ========================================

/// Aggregate row for one (card, format) as stored by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaRatings {
    pub format_id: String,
    pub set_code: String,
    pub card_code: String,
    pub rated_1: u32,
    pub rated_2: u32,
    pub rated_3: u32,
    pub rated_4: u32,
    pub rated_5: u32,
}

impl From<&SchemaRatings> for RatingAggregate {
    fn from(row: &SchemaRatings) -> Self {
        RatingAggregate {
            rated_1: row.rated_1,
            rated_2: row.rated_2,
            rated_3: row.rated_3,
            rated_4: row.rated_4,
            rated_5: row.rated_5,
            local_rating: None,
        }
    }
}

/// All format aggregates the backend has for one card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRatingsResponse {
    pub set_code: String,
    pub card_code: String,
    #[serde(default)]
    pub rating_by_format: HashMap<String, SchemaRatings>,
}

impl CardRatingsResponse {
    pub fn identity(&self) -> CardIdentity {
        CardIdentity::new(self.set_code.clone(), self.card_code.clone())
    }

    /// Convert to the in-memory record; local ratings are left unset
    pub fn to_card_ratings(&self) -> CardRatings {
        CardRatings {
            rating_by_format: self
                .rating_by_format
                .iter()
                .map(|(format_id, row)| (format_id.clone(), RatingAggregate::from(row)))
                .collect(),
        }
    }
}

/// Response of `GET /ratings?collection_id=<id>`
///
/// Sparse: only cards with at least one vote are listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingsGetResponse {
    pub collection_id: String,
    #[serde(default)]
    pub collection_info: CollectionInfo,
    #[serde(default)]
    pub ratings: Vec<CardRatingsResponse>,
}

/// Query string of `POST /ratings`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingsPostQuery {
    pub collection_id: String,
    pub rating: RatingValue,
    pub card_code: String,
    pub set_code: String,
    pub format_id: String,
}

impl RatingsPostQuery {
    pub fn new(
        collection_id: &str,
        identity: &CardIdentity,
        format_id: &str,
        rating: RatingValue,
    ) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            rating,
            card_code: identity.card_code.clone(),
            set_code: identity.set_code.clone(),
            format_id: format_id.to_string(),
        }
    }

    pub fn identity(&self) -> CardIdentity {
        CardIdentity::new(self.set_code.clone(), self.card_code.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratings_response_parses_backend_json() {
        let json = r#"{
            "collection_id": "otj",
            "collection_info": { "title": "Outlaws", "scryfall_query": "set%3Aotj", "set_order": ["otj"], "releasing": false },
            "ratings": [
                { "set_code": "otj", "card_code": "1", "rating_by_format": {
                    "limited": { "format_id": "limited", "set_code": "otj", "card_code": "1",
                                 "rated_1": 0, "rated_2": 1, "rated_3": 4, "rated_4": 2, "rated_5": 0 }
                } }
            ]
        }"#;
        let response: RatingsGetResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.ratings.len(), 1);

        let card = &response.ratings[0];
        assert_eq!(card.identity(), CardIdentity::new("otj", "1"));

        let ratings = card.to_card_ratings();
        let limited = ratings.format("limited").unwrap();
        assert_eq!(limited.distribution(), [0, 1, 4, 2, 0]);
        assert_eq!(limited.local_rating, None);
    }

    #[test]
    fn test_post_query_fields() {
        let query = RatingsPostQuery::new(
            "otj",
            &CardIdentity::new("otj", "7"),
            "cube",
            RatingValue::Four,
        );
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["rating"], 4);
        assert_eq!(json["card_code"], "7");
        assert_eq!(json["format_id"], "cube");
        assert_eq!(query.identity(), CardIdentity::new("otj", "7"));
    }
}
