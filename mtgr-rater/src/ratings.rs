//! Reconciled ratings for one collection

use mtgr_common::{CardIdentity, CardRatings, RatingAggregate};
use std::collections::HashMap;

/// Card identity → per-format aggregates
///
/// Rebuilt from scratch whenever a collection is loaded; mutated only by the
/// submission pipeline afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ratings {
    by_card: HashMap<CardIdentity, CardRatings>,
}

impl Ratings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &CardIdentity) -> Option<&CardRatings> {
        self.by_card.get(identity)
    }

    pub fn get_mut(&mut self, identity: &CardIdentity) -> Option<&mut CardRatings> {
        self.by_card.get_mut(identity)
    }

    pub fn aggregate(&self, identity: &CardIdentity, format_id: &str) -> Option<&RatingAggregate> {
        self.by_card.get(identity)?.format(format_id)
    }

    pub fn aggregate_mut(
        &mut self,
        identity: &CardIdentity,
        format_id: &str,
    ) -> Option<&mut RatingAggregate> {
        self.by_card.get_mut(identity)?.format_mut(format_id)
    }

    /// Aggregate for (card, format), created zeroed if missing
    pub fn aggregate_or_default(&mut self, identity: &CardIdentity, format_id: &str) -> &mut RatingAggregate {
        self.by_card
            .entry(identity.clone())
            .or_default()
            .rating_by_format
            .entry(format_id.to_string())
            .or_default()
    }

    pub fn insert(&mut self, identity: CardIdentity, ratings: CardRatings) -> Option<CardRatings> {
        self.by_card.insert(identity, ratings)
    }

    pub fn contains(&self, identity: &CardIdentity) -> bool {
        self.by_card.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.by_card.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_card.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CardIdentity, &CardRatings)> {
        self.by_card.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&CardIdentity, &mut CardRatings)> {
        self.by_card.iter_mut()
    }

    /// Whether the user rated this card in any format ("revealed")
    pub fn has_local_rating(&self, identity: &CardIdentity) -> bool {
        self.by_card
            .get(identity)
            .map(CardRatings::has_local_rating)
            .unwrap_or(false)
    }
}
