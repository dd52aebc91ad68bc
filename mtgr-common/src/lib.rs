//! # mtgr Common Library
//!
//! Shared code for the mtgr card-rating client including:
//! - Card identity, rating value and aggregate types
//! - Wire types for the ratings backend (collections, ratings, rating posts)
//! - Collection filter configuration
//! - Event types (RaterEvent enum) and the EventBus
//! - Configuration loading

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod filter_config;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use filter_config::{config_to_id, Color, FilterConfig, Rarity};
pub use types::{CardIdentity, CardRatings, Distribution, Format, FormatId, RatingAggregate, RatingValue};
