//! Collection load lifecycle types

use serde::{Deserialize, Serialize};

/// Coarse collection load status, as reported in events
///
/// The rater's session state machine carries the loaded data; this enum only
/// names the state so it can be broadcast and serialized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum LoadStatus {
    /// Nothing requested yet
    Idle,
    /// Catalog and ratings are being fetched
    Loading,
    /// Catalog resolved and ratings reconciled
    Loaded,
    /// Catalog or ratings fetch failed; nothing is shown
    Failed,
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStatus::Idle => write!(f, "Idle"),
            LoadStatus::Loading => write!(f, "Loading"),
            LoadStatus::Loaded => write!(f, "Loaded"),
            LoadStatus::Failed => write!(f, "Failed"),
        }
    }
}
