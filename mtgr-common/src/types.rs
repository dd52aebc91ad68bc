//! Card identity and rating types
//!
//! These are the join keys and value types shared by the catalog, the
//! reconciled ratings map and the local rating cache.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Format identifier (e.g. "limited", "cube")
pub type FormatId = String;

/// Vote counts for star values 1 through 5, in order
pub type Distribution = [u32; 5];

/// Identity of a card within a collection
///
/// `(set_code, card_code)` is unique within a resolved catalog and is used to
/// join catalog entries, server aggregates and locally cached ratings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardIdentity {
    /// Set code as reported by the card API (e.g. "otj")
    pub set_code: String,
    /// Collector number within the set (e.g. "123", "45a")
    pub card_code: String,
}

impl CardIdentity {
    pub fn new(set_code: impl Into<String>, card_code: impl Into<String>) -> Self {
        Self {
            set_code: set_code.into(),
            card_code: card_code.into(),
        }
    }
}

impl fmt::Display for CardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.set_code, self.card_code)
    }
}

/// A single star rating
///
/// Serialized as its numeric value so it can be used directly in query
/// strings and JSON bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RatingValue {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl RatingValue {
    /// All values in ascending order
    pub const ALL: [RatingValue; 5] = [
        RatingValue::One,
        RatingValue::Two,
        RatingValue::Three,
        RatingValue::Four,
        RatingValue::Five,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// String form used by the local rating cache ("1".."5")
    pub fn as_str(self) -> &'static str {
        match self {
            RatingValue::One => "1",
            RatingValue::Two => "2",
            RatingValue::Three => "3",
            RatingValue::Four => "4",
            RatingValue::Five => "5",
        }
    }

    /// Name of the aggregate counter this value increments
    pub fn counter_name(self) -> &'static str {
        match self {
            RatingValue::One => "rated_1",
            RatingValue::Two => "rated_2",
            RatingValue::Three => "rated_3",
            RatingValue::Four => "rated_4",
            RatingValue::Five => "rated_5",
        }
    }
}

impl TryFrom<u8> for RatingValue {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(RatingValue::One),
            2 => Ok(RatingValue::Two),
            3 => Ok(RatingValue::Three),
            4 => Ok(RatingValue::Four),
            5 => Ok(RatingValue::Five),
            other => Err(Error::InvalidInput(format!(
                "rating must be between 1 and 5, got {}",
                other
            ))),
        }
    }
}

impl From<RatingValue> for u8 {
    fn from(value: RatingValue) -> Self {
        value.as_u8()
    }
}

impl FromStr for RatingValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let value: u8 = trimmed
            .parse()
            .map_err(|_| Error::InvalidInput(format!("not a rating: {:?}", trimmed)))?;
        RatingValue::try_from(value)
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vote counts for one (card, format) pair plus this user's own vote
///
/// Counters only grow: the server reports them and the submission pipeline
/// increments them optimistically. Clearing a local rating never decrements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub rated_1: u32,
    pub rated_2: u32,
    pub rated_3: u32,
    pub rated_4: u32,
    pub rated_5: u32,
    /// Rating this user submitted, if any
    #[serde(default)]
    pub local_rating: Option<RatingValue>,
}

impl RatingAggregate {
    /// Zero counts, no local rating
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self, value: RatingValue) -> u32 {
        match value {
            RatingValue::One => self.rated_1,
            RatingValue::Two => self.rated_2,
            RatingValue::Three => self.rated_3,
            RatingValue::Four => self.rated_4,
            RatingValue::Five => self.rated_5,
        }
    }

    /// Add one vote for `value`
    pub fn increment(&mut self, value: RatingValue) {
        let counter = match value {
            RatingValue::One => &mut self.rated_1,
            RatingValue::Two => &mut self.rated_2,
            RatingValue::Three => &mut self.rated_3,
            RatingValue::Four => &mut self.rated_4,
            RatingValue::Five => &mut self.rated_5,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn distribution(&self) -> Distribution {
        [
            self.rated_1,
            self.rated_2,
            self.rated_3,
            self.rated_4,
            self.rated_5,
        ]
    }

    pub fn total(&self) -> u32 {
        self.distribution().iter().fold(0u32, |acc, n| acc.saturating_add(*n))
    }

    pub fn is_rated_locally(&self) -> bool {
        self.local_rating.is_some()
    }
}

/// Ratings for one card across all formats
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRatings {
    pub rating_by_format: HashMap<FormatId, RatingAggregate>,
}

impl CardRatings {
    /// Record with a zeroed aggregate for each format
    pub fn zeroed<'a>(formats: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            rating_by_format: formats
                .into_iter()
                .map(|f| (f.to_string(), RatingAggregate::empty()))
                .collect(),
        }
    }

    pub fn format(&self, format_id: &str) -> Option<&RatingAggregate> {
        self.rating_by_format.get(format_id)
    }

    pub fn format_mut(&mut self, format_id: &str) -> Option<&mut RatingAggregate> {
        self.rating_by_format.get_mut(format_id)
    }

    /// True once the user has rated this card in any format
    pub fn has_local_rating(&self) -> bool {
        self.rating_by_format.values().any(RatingAggregate::is_rated_locally)
    }
}

/// A rating dimension and whether this client shows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    pub id: FormatId,
    pub enabled: bool,
}

impl Format {
    /// Build the format list from the server's known formats, disabling any
    /// listed in `disabled`
    pub fn from_known(known: &[String], disabled: &[String]) -> Vec<Format> {
        known
            .iter()
            .map(|id| Format {
                id: id.clone(),
                enabled: !disabled.iter().any(|d| d == id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_value_parse() {
        assert_eq!("4".parse::<RatingValue>().unwrap(), RatingValue::Four);
        assert_eq!(" 1 ".parse::<RatingValue>().unwrap(), RatingValue::One);
        assert!("0".parse::<RatingValue>().is_err());
        assert!("6".parse::<RatingValue>().is_err());
        assert!("four".parse::<RatingValue>().is_err());
    }

    #[test]
    fn test_rating_value_serializes_as_number() {
        let json = serde_json::to_string(&RatingValue::Three).unwrap();
        assert_eq!(json, "3");
        let back: RatingValue = serde_json::from_str("5").unwrap();
        assert_eq!(back, RatingValue::Five);
        assert!(serde_json::from_str::<RatingValue>("9").is_err());
    }

    #[test]
    fn test_aggregate_increment_only_touches_one_counter() {
        let mut agg = RatingAggregate::empty();
        agg.increment(RatingValue::Two);
        agg.increment(RatingValue::Two);
        agg.increment(RatingValue::Five);
        assert_eq!(agg.distribution(), [0, 2, 0, 0, 1]);
        assert_eq!(agg.total(), 3);
        assert_eq!(agg.count(RatingValue::Two), 2);
    }

    #[test]
    fn test_card_ratings_local_flag() {
        let mut card = CardRatings::zeroed(["limited", "cube"]);
        assert!(!card.has_local_rating());
        card.format_mut("cube").unwrap().local_rating = Some(RatingValue::One);
        assert!(card.has_local_rating());
    }

    #[test]
    fn test_format_from_known() {
        let known = vec!["limited".to_string(), "cube".to_string()];
        let formats = Format::from_known(&known, &["cube".to_string()]);
        assert_eq!(formats.len(), 2);
        assert!(formats[0].enabled);
        assert!(!formats[1].enabled);
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(CardIdentity::new("otj", "12").to_string(), "otj/12");
    }
}
