//! Event types for the mtgr event system
//!
//! Provides the shared event definitions and the EventBus used by the rater
//! engine to report what it displays and what it writes.

mod load_types;

pub use load_types::LoadStatus;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{CardIdentity, RatingValue};

/// Rater event types
///
/// Broadcast via [`EventBus`]; serializable so a front end can forward them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RaterEvent {
    /// Collection load state changed
    CollectionLoadStateChanged {
        /// Collection being loaded
        collection_id: String,
        /// New state
        status: LoadStatus,
        /// Failure reason when `status` is Failed
        message: Option<String>,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A card's images were resolved and are now displayed
    ///
    /// Only emitted for the navigation generation that is still current;
    /// stale resolutions are dropped silently.
    CardDisplayed {
        /// Card shown
        identity: CardIdentity,
        /// Position in the filtered sequence
        index: usize,
        /// Navigation generation that produced this display
        generation: u64,
        /// Front image first, back image second for double-faced cards
        images: Vec<String>,
        /// When display changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Hover preview committed after the debounce delay
    PreviewCommitted {
        /// Card being previewed
        identity: CardIdentity,
        /// Position of the previewed card in the filtered sequence
        index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Hover preview retracted; the committed card is shown again
    PreviewCleared {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Filtered view rebuilt
    FilterChanged {
        /// 10-character filter identity
        filter_id: String,
        /// Cards in the new view
        visible_cards: usize,
        /// When filter changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Rating recorded locally and dispatched to the backend
    RatingSubmitted {
        collection_id: String,
        identity: CardIdentity,
        format_id: String,
        rating: RatingValue,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Background rating write failed (local state already reflects the vote)
    RatingWriteFailed {
        collection_id: String,
        identity: CardIdentity,
        format_id: String,
        /// Error text
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Local rating removed; aggregate counts are left as they were
    RatingCleared {
        collection_id: String,
        identity: CardIdentity,
        format_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RaterEvent {
    /// Event type name, matches the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            RaterEvent::CollectionLoadStateChanged { .. } => "CollectionLoadStateChanged",
            RaterEvent::CardDisplayed { .. } => "CardDisplayed",
            RaterEvent::PreviewCommitted { .. } => "PreviewCommitted",
            RaterEvent::PreviewCleared { .. } => "PreviewCleared",
            RaterEvent::FilterChanged { .. } => "FilterChanged",
            RaterEvent::RatingSubmitted { .. } => "RatingSubmitted",
            RaterEvent::RatingWriteFailed { .. } => "RatingWriteFailed",
            RaterEvent::RatingCleared { .. } => "RatingCleared",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use mtgr_common::events::{EventBus, LoadStatus, RaterEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(RaterEvent::CollectionLoadStateChanged {
///     collection_id: "otj".to_string(),
///     status: LoadStatus::Loading,
///     message: None,
///     timestamp: chrono::Utc::now(),
/// }).ok();
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.event_type(), "CollectionLoadStateChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RaterEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<RaterEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RaterEvent,
    ) -> Result<usize, broadcast::error::SendError<RaterEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RaterEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
