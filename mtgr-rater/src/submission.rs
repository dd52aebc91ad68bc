//! Rating submission pipeline
//!
//! A submission is recorded in three steps, in this order:
//!
//! 1. write the value to the local rating store
//! 2. increment the matching in-memory counter and mark the local rating
//! 3. dispatch the backend write in the background
//!
//! The network write never blocks the caller and its failure is only
//! logged: local state already reflects the vote. Clearing removes the local
//! value but leaves the counter it incremented untouched.

use mtgr_common::api::RatingsPostQuery;
use mtgr_common::events::{EventBus, RaterEvent};
use mtgr_common::{time, CardIdentity, FormatId, RatingValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::RatingsBackend;
use crate::error::{Error, Result};
use crate::ratings::Ratings;
use crate::store::LocalRatingStore;

/// Records votes for one collection
#[derive(Clone)]
pub struct SubmissionPipeline {
    collection_id: String,
    store: Arc<LocalRatingStore>,
    backend: Arc<dyn RatingsBackend>,
    events: EventBus,
}

impl SubmissionPipeline {
    pub fn new(
        collection_id: impl Into<String>,
        store: Arc<LocalRatingStore>,
        backend: Arc<dyn RatingsBackend>,
        events: EventBus,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            store,
            backend,
            events,
        }
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Record `value` for (card, format)
    ///
    /// `identity` is taken by value so later navigation can't redirect the
    /// write. Returns the handle of the background backend write.
    pub fn submit(
        &self,
        ratings: &mut Ratings,
        identity: CardIdentity,
        format_id: &str,
        value: RatingValue,
    ) -> Result<JoinHandle<()>> {
        if !ratings.contains(&identity) {
            return Err(Error::UnknownCard(identity));
        }
        let cached = self
            .store
            .local_rating(&self.collection_id, format_id, &identity);
        let aggregate = ratings
            .aggregate_mut(&identity, format_id)
            .ok_or_else(|| Error::UnknownFormat(format_id.to_string()))?;

        if aggregate.local_rating.is_some() || cached.is_some() {
            if aggregate.local_rating.is_none() {
                aggregate.local_rating = cached;
            }
            return Err(Error::AlreadyRated {
                identity,
                format_id: format_id.to_string(),
            });
        }

        self.store
            .set_local_rating(&self.collection_id, format_id, &identity, value);
        aggregate.increment(value);
        aggregate.local_rating = Some(value);

        info!(
            collection_id = %self.collection_id,
            card = %identity,
            format_id,
            rating = value.as_u8(),
            "Rating submitted"
        );

        self.events.emit_lossy(RaterEvent::RatingSubmitted {
            collection_id: self.collection_id.clone(),
            identity: identity.clone(),
            format_id: format_id.to_string(),
            rating: value,
            timestamp: time::now(),
        });

        let query = RatingsPostQuery::new(&self.collection_id, &identity, format_id, value);
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        Ok(tokio::spawn(async move {
            if let Err(e) = backend.post_rating(&query).await {
                warn!(
                    collection_id = %query.collection_id,
                    card = %query.identity(),
                    format_id = %query.format_id,
                    error = %e,
                    "Rating write failed"
                );
                events.emit_lossy(RaterEvent::RatingWriteFailed {
                    collection_id: query.collection_id.clone(),
                    identity: query.identity(),
                    format_id: query.format_id.clone(),
                    message: e.to_string(),
                    timestamp: time::now(),
                });
            }
        }))
    }

    /// Forget this user's rating for (card, format)
    ///
    /// Counters are not decremented. Returns false when nothing was rated.
    pub fn clear(&self, ratings: &mut Ratings, identity: &CardIdentity, format_id: &str) -> bool {
        let cached = self
            .store
            .local_rating(&self.collection_id, format_id, identity)
            .is_some();
        self.store
            .remove_local_rating(&self.collection_id, format_id, identity);

        let marked = match ratings.aggregate_mut(identity, format_id) {
            Some(aggregate) => aggregate.local_rating.take().is_some(),
            None => false,
        };

        if !(cached || marked) {
            debug!(card = %identity, format_id, "Nothing to clear");
            return false;
        }

        info!(collection_id = %self.collection_id, card = %identity, format_id, "Local rating cleared");
        self.events.emit_lossy(RaterEvent::RatingCleared {
            collection_id: self.collection_id.clone(),
            identity: identity.clone(),
            format_id: format_id.to_string(),
            timestamp: time::now(),
        });
        true
    }
}

/// Values chosen for the displayed card but not yet submitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSelections {
    identity: Option<CardIdentity>,
    values: BTreeMap<FormatId, RatingValue>,
}

impl PendingSelections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose `value` for a format; choosing for another card starts over
    pub fn select(&mut self, identity: &CardIdentity, format_id: &str, value: RatingValue) {
        if self.identity.as_ref() != Some(identity) {
            self.values.clear();
            self.identity = Some(identity.clone());
        }
        self.values.insert(format_id.to_string(), value);
    }

    pub fn get(&self, identity: &CardIdentity, format_id: &str) -> Option<RatingValue> {
        if self.identity.as_ref() != Some(identity) {
            return None;
        }
        self.values.get(format_id).copied()
    }

    pub fn identity(&self) -> Option<&CardIdentity> {
        self.identity.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove and return everything selected for `identity`
    pub fn take_for(&mut self, identity: &CardIdentity) -> Vec<(FormatId, RatingValue)> {
        if self.identity.as_ref() != Some(identity) {
            return Vec::new();
        }
        self.identity = None;
        std::mem::take(&mut self.values).into_iter().collect()
    }

    pub fn clear(&mut self) {
        self.identity = None;
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_selection_is_per_card() {
        let a = CardIdentity::new("otj", "1");
        let b = CardIdentity::new("otj", "2");
        let mut pending = PendingSelections::new();

        pending.select(&a, "limited", RatingValue::Three);
        pending.select(&a, "cube", RatingValue::Five);
        assert_eq!(pending.get(&a, "cube"), Some(RatingValue::Five));
        assert_eq!(pending.get(&b, "cube"), None);

        pending.select(&b, "limited", RatingValue::One);
        assert_eq!(pending.get(&a, "limited"), None);
        assert!(pending.take_for(&a).is_empty());

        let taken = pending.take_for(&b);
        assert_eq!(taken, vec![("limited".to_string(), RatingValue::One)]);
        assert!(pending.is_empty());
    }
}
