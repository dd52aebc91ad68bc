//! Ratings backend wire types
//!
//! Request and response shapes for the collections and ratings endpoints.
//! Field names are snake_case because they match the backend JSON.

pub mod types;

pub use types::{
    CardRatingsResponse, CollectionInfo, CollectionsJson, RatingsGetResponse, RatingsPostQuery,
    SchemaRatings,
};
