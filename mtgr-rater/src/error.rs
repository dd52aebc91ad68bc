//! Error types for mtgr-rater
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use mtgr_common::CardIdentity;
use thiserror::Error;

/// Main error type for mtgr-rater
#[derive(Error, Debug)]
pub enum Error {
    /// Request could not be sent or the response body could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// Remote endpoint answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Remote endpoint answered 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Catalog resolution aborted
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Durable storage failure (only surfaced by the storage backends themselves)
    #[error("Storage error: {0}")]
    Storage(String),

    /// The user already rated this card in this format
    #[error("{identity} already rated in format {format_id}")]
    AlreadyRated {
        identity: CardIdentity,
        format_id: String,
    },

    /// Format not known for this collection
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// Collection id not present in the collections list
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Card not present in the catalog
    #[error("Card not in catalog: {0}")]
    UnknownCard(CardIdentity),

    /// Filtered view has no cards to navigate
    #[error("Empty view: {0}")]
    EmptyView(String),

    /// Index outside the filtered view
    #[error("Index {index} out of range for {len} cards")]
    IndexOutOfRange { index: usize, len: usize },

    /// Background task ended without producing a result
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] mtgr_common::Error),
}

/// Convenience Result type using mtgr-rater Error
pub type Result<T> = std::result::Result<T, Error>;
