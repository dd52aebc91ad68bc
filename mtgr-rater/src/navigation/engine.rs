//! Navigation and prefetch engine
//!
//! Keeps the current position in a filtered view, resolves the images for
//! the card at that position and prefetches the neighbors on either side.
//! Neighbors and hover previews go through the same resolver as the
//! displayed card, so what gets warmed is what gets shown.
//!
//! Every committed navigation bumps a generation counter. Resolution tasks
//! carry the generation they were started for and report back over a
//! channel; a result whose generation is no longer current is dropped, so a
//! slow resolution can never overwrite a newer display. Every resolution
//! task reports exactly once, even if the resolver panics.

use mtgr_common::events::{EventBus, RaterEvent};
use mtgr_common::{time, CardIdentity};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::art::ArtResolver;
use super::prefetch::Prefetcher;
use super::preview::PreviewOverride;
use crate::error::{Error, Result};
use crate::catalog::CatalogEntry;
use crate::filter::CatalogView;

/// Collaborators shared by every engine of a session
#[derive(Clone)]
pub struct NavigationDeps {
    pub resolver: Arc<dyn ArtResolver>,
    pub prefetcher: Arc<dyn Prefetcher>,
    pub events: EventBus,
    pub preview_delay: Duration,
}

/// Card currently on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedCard {
    /// Position in the filtered view
    pub index: usize,
    pub identity: CardIdentity,
    /// Generation of the navigation that produced this display
    pub generation: u64,
    /// Front first, back second for multi-faced cards
    pub images: Vec<String>,
    /// Face currently shown
    pub face: usize,
}

impl DisplayedCard {
    pub fn image(&self) -> Option<&str> {
        self.images.get(self.face).map(String::as_str)
    }

    pub fn can_flip(&self) -> bool {
        self.images.len() > 1
    }
}

/// Hovered position awaiting (or holding) preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTarget {
    pub index: usize,
    pub identity: CardIdentity,
    /// Resolved art of the hovered card
    pub images: Vec<String>,
}

struct Resolution {
    generation: u64,
    index: usize,
    identity: CardIdentity,
    images: Result<Vec<String>>,
}

/// Wraparound navigation over one filtered view
///
/// Built fresh whenever the filter changes: positions in one view mean
/// nothing in another.
pub struct NavigationEngine {
    view: Arc<CatalogView>,
    index: usize,
    generation: u64,
    displayed: Option<DisplayedCard>,
    deps: NavigationDeps,
    results_tx: mpsc::UnboundedSender<Resolution>,
    results_rx: mpsc::UnboundedReceiver<Resolution>,
    in_flight: usize,
    preview: PreviewOverride<PreviewTarget>,
}

impl NavigationEngine {
    /// Start at `start` (clamped to the view) and begin resolving it
    pub fn new(view: Arc<CatalogView>, start: usize, deps: NavigationDeps) -> Result<Self> {
        if view.is_empty() {
            return Err(Error::EmptyView(view.filter_id().to_string()));
        }

        let events = deps.events.clone();
        let preview = PreviewOverride::new(deps.preview_delay).on_commit(move |target: &PreviewTarget| {
            events.emit_lossy(RaterEvent::PreviewCommitted {
                identity: target.identity.clone(),
                index: target.index,
                timestamp: time::now(),
            });
        });

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let index = start.min(view.len() - 1);

        let mut engine = Self {
            view,
            index,
            generation: 0,
            displayed: None,
            deps,
            results_tx,
            results_rx,
            in_flight: 0,
            preview,
        };
        engine.commit();
        Ok(engine)
    }

    pub fn view(&self) -> &Arc<CatalogView> {
        &self.view
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_identity(&self) -> Option<&CardIdentity> {
        self.view.identity_at(self.index)
    }

    /// Last resolution that was still current when it finished
    pub fn displayed(&self) -> Option<&DisplayedCard> {
        self.displayed.as_ref()
    }

    /// Resolutions started but not yet received
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn next(&mut self) -> usize {
        self.index = (self.index + 1) % self.view.len();
        self.commit();
        self.index
    }

    pub fn prev(&mut self) -> usize {
        let len = self.view.len();
        self.index = (self.index + len - 1) % len;
        self.commit();
        self.index
    }

    pub fn go_to(&mut self, index: usize) -> Result<()> {
        if index >= self.view.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.view.len(),
            });
        }
        self.index = index;
        self.commit();
        Ok(())
    }

    /// Apply whatever resolutions have already arrived
    pub fn apply_ready(&mut self) {
        while let Ok(resolution) = self.results_rx.try_recv() {
            self.apply(resolution);
        }
    }

    /// Wait for every outstanding resolution and apply the current one
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.results_rx.recv().await {
                Some(resolution) => self.apply(resolution),
                None => break,
            }
        }
    }

    /// Image to show right now: a committed hover preview wins over the
    /// displayed card
    pub fn displayed_image(&self) -> Option<String> {
        if let Some(front) = self.preview.current().and_then(|t| t.images.into_iter().next()) {
            return Some(front);
        }
        self.displayed
            .as_ref()
            .and_then(|d| d.image())
            .map(str::to_string)
    }

    /// Pointer entered a navigator entry
    ///
    /// The hovered card's art is resolved while the preview delay runs.
    pub fn hover_enter(&mut self, index: usize) -> Result<()> {
        let entry = self
            .view
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.view.len(),
            })?;
        let resolver = Arc::clone(&self.deps.resolver);
        self.preview.set_with(async move {
            let images = resolve_or_catalog(resolver.as_ref(), &entry).await;
            PreviewTarget {
                index,
                identity: entry.identity,
                images,
            }
        });
        Ok(())
    }

    /// Pointer left the navigator
    pub fn hover_leave(&mut self) {
        if self.preview.retract() {
            self.deps.events.emit_lossy(RaterEvent::PreviewCleared {
                timestamp: time::now(),
            });
        }
    }

    pub fn preview(&self) -> Option<PreviewTarget> {
        self.preview.current()
    }

    /// Show the other face of a multi-faced card; false if there is none
    pub fn flip(&mut self) -> bool {
        match self.displayed.as_mut() {
            Some(card) if card.can_flip() => {
                card.face = (card.face + 1) % card.images.len();
                true
            }
            _ => false,
        }
    }

    fn commit(&mut self) {
        self.generation += 1;
        let generation = self.generation;

        let Some(entry) = self.view.get(self.index).cloned() else {
            return;
        };
        let index = self.index;

        debug!(card = %entry.identity, index, generation, "Resolving card");

        let resolver = Arc::clone(&self.deps.resolver);
        let tx = self.results_tx.clone();
        self.in_flight += 1;
        let identity = entry.identity.clone();
        tokio::spawn(async move {
            let images = tokio::spawn(async move { resolver.resolve(&entry).await })
                .await
                .unwrap_or_else(|e| Err(Error::TaskFailed(format!("art resolution: {}", e))));
            // Receiver is gone once the engine is dropped
            let _ = tx.send(Resolution {
                generation,
                index,
                identity,
                images,
            });
        });

        self.prefetch_neighbors();
    }

    fn prefetch_neighbors(&self) {
        let len = self.view.len();
        if len < 2 {
            return;
        }

        let after = (self.index + 1) % len;
        let before = (self.index + len - 1) % len;
        let mut neighbors = vec![after];
        if before != after {
            neighbors.push(before);
        }

        let entries: Vec<CatalogEntry> = neighbors
            .into_iter()
            .filter_map(|i| self.view.get(i).cloned())
            .collect();

        let resolver = Arc::clone(&self.deps.resolver);
        let prefetcher = Arc::clone(&self.deps.prefetcher);
        tokio::spawn(async move {
            for entry in entries {
                for uri in resolve_or_catalog(resolver.as_ref(), &entry).await {
                    prefetcher.prefetch(&uri).await;
                }
            }
        });
    }

    fn apply(&mut self, resolution: Resolution) {
        self.in_flight = self.in_flight.saturating_sub(1);

        if resolution.generation != self.generation {
            debug!(
                card = %resolution.identity,
                generation = resolution.generation,
                current = self.generation,
                "Dropping stale resolution"
            );
            return;
        }

        let images = match resolution.images {
            Ok(images) if !images.is_empty() => images,
            Ok(_) => self.catalog_art(resolution.index),
            Err(e) => {
                warn!(card = %resolution.identity, error = %e, "Art resolution failed, using catalog art");
                self.catalog_art(resolution.index)
            }
        };

        self.deps.events.emit_lossy(RaterEvent::CardDisplayed {
            identity: resolution.identity.clone(),
            index: resolution.index,
            generation: resolution.generation,
            images: images.clone(),
            timestamp: time::now(),
        });

        self.displayed = Some(DisplayedCard {
            index: resolution.index,
            identity: resolution.identity,
            generation: resolution.generation,
            images,
            face: 0,
        });
    }

    fn catalog_art(&self, index: usize) -> Vec<String> {
        self.view
            .get(index)
            .map(|entry| entry.art.uris())
            .unwrap_or_default()
    }
}

/// Resolved art, or the catalog's when the resolver has nothing usable
async fn resolve_or_catalog(resolver: &dyn ArtResolver, entry: &CatalogEntry) -> Vec<String> {
    match resolver.resolve(entry).await {
        Ok(images) if !images.is_empty() => images,
        Ok(_) => entry.art.uris(),
        Err(e) => {
            debug!(card = %entry.identity, error = %e, "Art resolution failed, using catalog art");
            entry.art.uris()
        }
    }
}
