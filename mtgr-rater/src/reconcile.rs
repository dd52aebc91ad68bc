//! Ratings reconciliation
//!
//! Merges the backend's sparse aggregates with the catalog and the local
//! rating cache:
//!
//! 1. index server aggregates by card identity
//! 2. zero-fill every catalog card (and every missing format) the server
//!    has not reported
//! 3. overlay this user's cached rating onto every (card, format)
//!
//! Zero-fill runs before the overlay so cards the server has never seen
//! still pick up local ratings.

use mtgr_common::api::CardRatingsResponse;
use mtgr_common::{CardRatings, FormatId};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::ratings::Ratings;
use crate::store::LocalRatingStore;

/// Step 1: index the backend's aggregates
pub fn index_server_ratings(raw: &[CardRatingsResponse]) -> Ratings {
    let mut ratings = Ratings::new();
    for card in raw {
        if ratings.insert(card.identity(), card.to_card_ratings()).is_some() {
            debug!(card = %card.identity(), "Backend listed card twice, keeping last");
        }
    }
    ratings
}

/// Step 2: every catalog card gets an aggregate for every format
///
/// Returns the number of cards that had no server record.
pub fn fill_missing(ratings: &mut Ratings, catalog: &Catalog, formats: &[FormatId]) -> usize {
    let mut filled = 0;
    for identity in catalog.identities() {
        match ratings.get_mut(identity) {
            Some(card) => {
                for format_id in formats {
                    card.rating_by_format.entry(format_id.clone()).or_default();
                }
            }
            None => {
                ratings.insert(
                    identity.clone(),
                    CardRatings::zeroed(formats.iter().map(String::as_str)),
                );
                filled += 1;
            }
        }
    }
    filled
}

/// Step 3: copy cached local ratings onto every (card, format)
///
/// A pair with nothing cached ends up with `local_rating = None` even if the
/// server payload carried something else. Returns the number of local
/// ratings applied.
pub fn overlay_local(
    ratings: &mut Ratings,
    store: &LocalRatingStore,
    collection_id: &str,
    formats: &[FormatId],
) -> usize {
    let mut applied = 0;
    for (identity, card) in ratings.iter_mut() {
        for format_id in formats {
            let local = store.local_rating(collection_id, format_id, identity);
            if let Some(aggregate) = card.format_mut(format_id) {
                aggregate.local_rating = local;
                if local.is_some() {
                    applied += 1;
                }
            }
        }
    }
    applied
}

/// Build the complete ratings map for a freshly loaded collection
pub fn reconcile(
    raw: &[CardRatingsResponse],
    catalog: &Catalog,
    formats: &[FormatId],
    store: &LocalRatingStore,
    collection_id: &str,
) -> Ratings {
    let mut ratings = index_server_ratings(raw);
    let from_server = ratings.len();
    let filled = fill_missing(&mut ratings, catalog, formats);
    let local = overlay_local(&mut ratings, store, collection_id, formats);

    info!(
        collection_id,
        from_server,
        filled,
        local,
        "Reconciled ratings"
    );

    ratings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ImageUris, ScryfallCard};
    use mtgr_common::api::SchemaRatings;
    use mtgr_common::{CardIdentity, RatingValue};
    use std::collections::HashMap;

    fn catalog(ids: &[(&str, &str)]) -> Catalog {
        Catalog::from_cards(ids.iter().map(|(s, c)| ScryfallCard {
            set: s.to_string(),
            collector_number: c.to_string(),
            image_uris: Some(ImageUris::default()),
            ..Default::default()
        }))
    }

    fn server_card(set: &str, card: &str, format: &str, counts: [u32; 5]) -> CardRatingsResponse {
        let mut rating_by_format = HashMap::new();
        rating_by_format.insert(
            format.to_string(),
            SchemaRatings {
                format_id: format.to_string(),
                set_code: set.to_string(),
                card_code: card.to_string(),
                rated_1: counts[0],
                rated_2: counts[1],
                rated_3: counts[2],
                rated_4: counts[3],
                rated_5: counts[4],
            },
        );
        CardRatingsResponse {
            set_code: set.to_string(),
            card_code: card.to_string(),
            rating_by_format,
        }
    }

    fn formats() -> Vec<FormatId> {
        vec!["limited".to_string(), "cube".to_string()]
    }

    #[test]
    fn test_every_catalog_card_has_every_format() {
        let catalog = catalog(&[("otj", "1"), ("otj", "2"), ("otj", "3")]);
        let raw = vec![server_card("otj", "2", "limited", [0, 0, 3, 1, 0])];
        let store = LocalRatingStore::in_memory();

        let ratings = reconcile(&raw, &catalog, &formats(), &store, "otj");

        for identity in catalog.identities() {
            for format_id in formats() {
                assert!(
                    ratings.aggregate(identity, &format_id).is_some(),
                    "{} missing {}",
                    identity,
                    format_id
                );
            }
        }

        let reported = ratings.aggregate(&CardIdentity::new("otj", "2"), "limited").unwrap();
        assert_eq!(reported.distribution(), [0, 0, 3, 1, 0]);
        let filled = ratings.aggregate(&CardIdentity::new("otj", "2"), "cube").unwrap();
        assert_eq!(filled.total(), 0);
    }

    #[test]
    fn test_local_overlay_wins() {
        let catalog = catalog(&[("otj", "1"), ("otj", "2")]);
        let raw = vec![server_card("otj", "1", "limited", [1, 0, 0, 0, 0])];
        let store = LocalRatingStore::in_memory();
        let rated = CardIdentity::new("otj", "1");
        let unseen = CardIdentity::new("otj", "2");
        store.set_local_rating("otj", "limited", &rated, RatingValue::Four);
        store.set_local_rating("otj", "cube", &unseen, RatingValue::Two);

        let ratings = reconcile(&raw, &catalog, &formats(), &store, "otj");

        assert_eq!(
            ratings.aggregate(&rated, "limited").unwrap().local_rating,
            Some(RatingValue::Four)
        );
        assert_eq!(ratings.aggregate(&rated, "cube").unwrap().local_rating, None);
        // Zero-filled card still sees its cached rating
        assert_eq!(
            ratings.aggregate(&unseen, "cube").unwrap().local_rating,
            Some(RatingValue::Two)
        );
    }

    #[test]
    fn test_other_collection_cache_is_ignored() {
        let catalog = catalog(&[("otj", "1")]);
        let store = LocalRatingStore::in_memory();
        let card = CardIdentity::new("otj", "1");
        store.set_local_rating("draft_otj", "limited", &card, RatingValue::Five);

        let ratings = reconcile(&[], &catalog, &formats(), &store, "otj");
        assert!(!ratings.has_local_rating(&card));
    }

    #[test]
    fn test_fill_missing_counts_new_cards() {
        let catalog = catalog(&[("otj", "1"), ("otj", "2")]);
        let mut ratings = index_server_ratings(&[server_card("otj", "1", "limited", [0; 5])]);
        assert_eq!(fill_missing(&mut ratings, &catalog, &formats()), 1);
        assert_eq!(ratings.len(), 2);
    }
}
