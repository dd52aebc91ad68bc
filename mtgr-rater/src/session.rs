//! Rater session: collection loading and the interactive workflow
//!
//! Loading is an explicit state machine:
//!
//! ```text
//! Idle ──load──▶ Loading ──ok──▶ Loaded
//!                   │
//!                   └──err──▶ Failed
//! ```
//!
//! The catalog and the backend ratings are fetched concurrently; either
//! failing fails the load and nothing partial is kept. Once loaded, the
//! session owns the filtered view, the navigation engine mounted on it and
//! the submission pipeline.

use mtgr_common::api::{CollectionInfo, CollectionsJson};
use mtgr_common::events::{EventBus, LoadStatus, RaterEvent};
use mtgr_common::{time, CardIdentity, FilterConfig, Format, FormatId, RatingAggregate, RatingValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::RatingsBackend;
use crate::catalog::{reorder_by_set_order, resolve_catalog, CardSource, Catalog};
use crate::error::{Error, Result};
use crate::export;
use crate::filter::{filter_catalog, CatalogView};
use crate::navigation::navigator::{self, NavigatorItem};
use crate::navigation::{NavigationDeps, NavigationEngine, Segment};
use crate::ratings::Ratings;
use crate::reconcile::reconcile;
use crate::store::LocalRatingStore;
use crate::submission::{PendingSelections, SubmissionPipeline};

/// Everything known about a loaded collection
#[derive(Debug, Clone)]
pub struct LoadedCollection {
    pub collection_id: String,
    pub info: CollectionInfo,
    pub catalog: Arc<Catalog>,
    pub ratings: Ratings,
    /// Every format the backend tracks, with this client's enabled flag
    pub formats: Vec<Format>,
}

impl LoadedCollection {
    pub fn enabled_formats(&self) -> impl Iterator<Item = &Format> {
        self.formats.iter().filter(|f| f.enabled)
    }

    pub fn has_format(&self, format_id: &str) -> bool {
        self.formats.iter().any(|f| f.enabled && f.id == format_id)
    }
}

/// Collection load state
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading {
        collection_id: String,
    },
    Loaded(Box<LoadedCollection>),
    Failed {
        collection_id: String,
        message: String,
    },
}

impl LoadState {
    pub fn status(&self) -> LoadStatus {
        match self {
            LoadState::Idle => LoadStatus::Idle,
            LoadState::Loading { .. } => LoadStatus::Loading,
            LoadState::Loaded(_) => LoadStatus::Loaded,
            LoadState::Failed { .. } => LoadStatus::Failed,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }
}

/// Fetches and reconciles one collection
pub struct CollectionLoader {
    source: Arc<dyn CardSource>,
    backend: Arc<dyn RatingsBackend>,
    store: Arc<LocalRatingStore>,
    events: EventBus,
    apply_set_order: bool,
    disabled_formats: Vec<String>,
}

impl CollectionLoader {
    pub fn new(
        source: Arc<dyn CardSource>,
        backend: Arc<dyn RatingsBackend>,
        store: Arc<LocalRatingStore>,
        events: EventBus,
    ) -> Self {
        Self {
            source,
            backend,
            store,
            events,
            apply_set_order: false,
            disabled_formats: Vec::new(),
        }
    }

    /// Reorder catalogs by the collection's set order
    pub fn with_set_order(mut self, apply: bool) -> Self {
        self.apply_set_order = apply;
        self
    }

    /// Hide formats from rating and export
    pub fn with_disabled_formats(mut self, disabled: Vec<String>) -> Self {
        self.disabled_formats = disabled;
        self
    }

    pub fn backend(&self) -> &Arc<dyn RatingsBackend> {
        &self.backend
    }

    pub fn store(&self) -> &Arc<LocalRatingStore> {
        &self.store
    }

    pub async fn collections(&self) -> Result<CollectionsJson> {
        self.backend.get_collections().await
    }

    fn emit_status(&self, collection_id: &str, status: LoadStatus, message: Option<String>) {
        self.events.emit_lossy(RaterEvent::CollectionLoadStateChanged {
            collection_id: collection_id.to_string(),
            status,
            message,
            timestamp: time::now(),
        });
    }

    /// Resolve catalog and ratings for `collection_id` and reconcile them
    pub async fn load(&self, collections: &CollectionsJson, collection_id: &str) -> Result<LoadedCollection> {
        let info = collections
            .entries
            .get(collection_id)
            .cloned()
            .ok_or_else(|| Error::UnknownCollection(collection_id.to_string()))?;

        info!(collection_id, title = %info.title, "Loading collection");
        self.emit_status(collection_id, LoadStatus::Loading, None);

        let fetched = tokio::try_join!(
            resolve_catalog(self.source.as_ref(), &info),
            self.backend.get_ratings(collection_id)
        );
        let (catalog, raw) = match fetched {
            Ok(result) => result,
            Err(e) => {
                warn!(collection_id, error = %e, "Collection load failed");
                self.emit_status(collection_id, LoadStatus::Failed, Some(e.to_string()));
                return Err(e);
            }
        };

        let catalog = if self.apply_set_order {
            reorder_by_set_order(catalog, &info.set_order)
        } else {
            catalog
        };

        let formats = Format::from_known(&collections.formats, &self.disabled_formats);
        let format_ids: Vec<FormatId> = formats.iter().map(|f| f.id.clone()).collect();
        let ratings = reconcile(&raw.ratings, &catalog, &format_ids, &self.store, collection_id);

        self.emit_status(collection_id, LoadStatus::Loaded, None);

        Ok(LoadedCollection {
            collection_id: collection_id.to_string(),
            info,
            catalog: Arc::new(catalog),
            ratings,
            formats,
        })
    }
}

/// One user's rating session
pub struct RaterSession {
    loader: CollectionLoader,
    deps: NavigationDeps,
    collections: Option<CollectionsJson>,
    state: LoadState,
    filter: FilterConfig,
    view: Option<Arc<CatalogView>>,
    engine: Option<NavigationEngine>,
    pipeline: Option<SubmissionPipeline>,
    pending: PendingSelections,
}

impl RaterSession {
    pub fn new(loader: CollectionLoader, deps: NavigationDeps) -> Self {
        Self {
            loader,
            deps,
            collections: None,
            state: LoadState::Idle,
            filter: FilterConfig::default(),
            view: None,
            engine: None,
            pipeline: None,
            pending: PendingSelections::new(),
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn loaded(&self) -> Option<&LoadedCollection> {
        match &self.state {
            LoadState::Loaded(loaded) => Some(loaded),
            _ => None,
        }
    }

    /// Collections list, fetched once per session
    pub async fn collections(&mut self) -> Result<&CollectionsJson> {
        if self.collections.is_none() {
            self.collections = Some(self.loader.collections().await?);
        }
        self.collections
            .as_ref()
            .ok_or_else(|| Error::InvalidState("collections not loaded".to_string()))
    }

    /// Load a collection (the backend's latest when `None`) and mount the
    /// navigation view at its first card
    pub async fn load(&mut self, collection_id: Option<&str>) -> Result<()> {
        self.engine = None;
        self.view = None;
        self.pipeline = None;
        self.pending.clear();

        let collections = match self.collections().await {
            Ok(collections) => collections.clone(),
            Err(e) => {
                self.state = LoadState::Failed {
                    collection_id: collection_id.unwrap_or_default().to_string(),
                    message: e.to_string(),
                };
                return Err(e);
            }
        };
        let collection_id = collection_id.unwrap_or(collections.latest.as_str()).to_string();

        self.state = LoadState::Loading {
            collection_id: collection_id.clone(),
        };

        match self.loader.load(&collections, &collection_id).await {
            Ok(loaded) => {
                self.pipeline = Some(SubmissionPipeline::new(
                    collection_id,
                    Arc::clone(self.loader.store()),
                    Arc::clone(self.loader.backend()),
                    self.deps.events.clone(),
                ));
                self.state = LoadState::Loaded(Box::new(loaded));
                self.mount()
            }
            Err(e) => {
                self.state = LoadState::Failed {
                    collection_id,
                    message: e.to_string(),
                };
                Err(e)
            }
        }
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    /// Switch filter; the view and engine are rebuilt only if its identity
    /// changed
    pub fn apply_filter(&mut self, filter: FilterConfig) -> Result<()> {
        if filter.id() == self.filter.id() && self.view.is_some() {
            return Ok(());
        }
        self.filter = filter;
        if self.state.is_loaded() {
            self.mount()?;
        }
        Ok(())
    }

    fn mount(&mut self) -> Result<()> {
        let catalog = match &self.state {
            LoadState::Loaded(loaded) => Arc::clone(&loaded.catalog),
            _ => return Err(Error::InvalidState("no collection loaded".to_string())),
        };

        let view = Arc::new(filter_catalog(catalog, &self.filter));
        self.pending.clear();
        self.deps.events.emit_lossy(RaterEvent::FilterChanged {
            filter_id: view.filter_id().to_string(),
            visible_cards: view.len(),
            timestamp: time::now(),
        });

        self.engine = if view.is_empty() {
            warn!(filter_id = %view.filter_id(), "No cards match the filter");
            None
        } else {
            Some(NavigationEngine::new(Arc::clone(&view), 0, self.deps.clone())?)
        };
        self.view = Some(view);
        Ok(())
    }

    pub fn view(&self) -> Option<&Arc<CatalogView>> {
        self.view.as_ref()
    }

    pub fn engine(&self) -> Option<&NavigationEngine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut NavigationEngine> {
        self.engine.as_mut()
    }

    fn engine_or_err(&mut self) -> Result<&mut NavigationEngine> {
        let filter_id = self.filter.id();
        self.engine.as_mut().ok_or(Error::EmptyView(filter_id))
    }

    pub fn current_card(&self) -> Option<CardIdentity> {
        self.engine.as_ref()?.current_identity().cloned()
    }

    pub fn aggregate(&self, identity: &CardIdentity, format_id: &str) -> Option<&RatingAggregate> {
        self.loaded()?.ratings.aggregate(identity, format_id)
    }

    /// The current card has a local rating in at least one format
    pub fn is_revealed(&self) -> bool {
        match (self.loaded(), self.current_card()) {
            (Some(loaded), Some(identity)) => loaded.ratings.has_local_rating(&identity),
            _ => false,
        }
    }

    /// Choose a value for the current card without submitting it
    pub fn select(&mut self, format_id: &str, value: RatingValue) -> Result<()> {
        let identity = self
            .current_card()
            .ok_or_else(|| Error::EmptyView(self.filter.id()))?;
        let loaded = self
            .loaded()
            .ok_or_else(|| Error::InvalidState("no collection loaded".to_string()))?;
        if !loaded.has_format(format_id) {
            return Err(Error::UnknownFormat(format_id.to_string()));
        }
        if loaded
            .ratings
            .aggregate(&identity, format_id)
            .map(RatingAggregate::is_rated_locally)
            .unwrap_or(false)
        {
            return Err(Error::AlreadyRated {
                identity,
                format_id: format_id.to_string(),
            });
        }
        self.pending.select(&identity, format_id, value);
        Ok(())
    }

    pub fn pending(&self) -> &PendingSelections {
        &self.pending
    }

    /// Submit every pending selection for the current card
    pub fn reveal(&mut self) -> Result<Vec<JoinHandle<()>>> {
        match self.current_card() {
            Some(identity) => self.submit_pending(&identity),
            None => Err(Error::EmptyView(self.filter.id())),
        }
    }

    fn submit_pending(&mut self, identity: &CardIdentity) -> Result<Vec<JoinHandle<()>>> {
        let selections = self.pending.take_for(identity);
        if selections.is_empty() {
            return Ok(Vec::new());
        }

        let (pipeline, loaded) = match (&self.pipeline, &mut self.state) {
            (Some(pipeline), LoadState::Loaded(loaded)) => (pipeline, loaded),
            _ => return Err(Error::InvalidState("no collection loaded".to_string())),
        };

        let mut handles = Vec::with_capacity(selections.len());
        for (format_id, value) in selections {
            match pipeline.submit(&mut loaded.ratings, identity.clone(), &format_id, value) {
                Ok(handle) => handles.push(handle),
                Err(Error::AlreadyRated { .. }) => {
                    warn!(card = %identity, format_id = %format_id, "Skipping pending value, already rated");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(handles)
    }

    /// Leaving an unrevealed card submits what was selected on it
    fn auto_submit(&mut self) -> Result<()> {
        if self.is_revealed() {
            self.pending.clear();
            return Ok(());
        }
        if let Some(identity) = self.current_card() {
            self.submit_pending(&identity)?;
        }
        Ok(())
    }

    pub fn next(&mut self) -> Result<usize> {
        self.auto_submit()?;
        Ok(self.engine_or_err()?.next())
    }

    pub fn prev(&mut self) -> Result<usize> {
        self.auto_submit()?;
        Ok(self.engine_or_err()?.prev())
    }

    pub fn go_to(&mut self, index: usize) -> Result<()> {
        self.auto_submit()?;
        self.engine_or_err()?.go_to(index)
    }

    /// Submit a value for the current card right away
    pub fn submit(&mut self, format_id: &str, value: RatingValue) -> Result<JoinHandle<()>> {
        let identity = self
            .current_card()
            .ok_or_else(|| Error::EmptyView(self.filter.id()))?;
        self.submit_for(identity, format_id, value)
    }

    /// Submit a value for any card of the loaded catalog
    pub fn submit_for(
        &mut self,
        identity: CardIdentity,
        format_id: &str,
        value: RatingValue,
    ) -> Result<JoinHandle<()>> {
        let (pipeline, loaded) = match (&self.pipeline, &mut self.state) {
            (Some(pipeline), LoadState::Loaded(loaded)) => (pipeline, loaded),
            _ => return Err(Error::InvalidState("no collection loaded".to_string())),
        };
        if !loaded.catalog.contains(&identity) {
            return Err(Error::UnknownCard(identity));
        }
        if !loaded.has_format(format_id) {
            return Err(Error::UnknownFormat(format_id.to_string()));
        }
        pipeline.submit(&mut loaded.ratings, identity, format_id, value)
    }

    /// Remove the local rating for (card, format); counters are kept
    pub fn clear(&mut self, identity: &CardIdentity, format_id: &str) -> Result<bool> {
        let (pipeline, loaded) = match (&self.pipeline, &mut self.state) {
            (Some(pipeline), LoadState::Loaded(loaded)) => (pipeline, loaded),
            _ => return Err(Error::InvalidState("no collection loaded".to_string())),
        };
        Ok(pipeline.clear(&mut loaded.ratings, identity, format_id))
    }

    /// CSV of the current view
    pub fn export_csv(&self) -> Result<String> {
        let loaded = self
            .loaded()
            .ok_or_else(|| Error::InvalidState("no collection loaded".to_string()))?;
        let view = self
            .view
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no view mounted".to_string()))?;
        Ok(export::export_csv(view, &loaded.ratings, &loaded.formats))
    }

    /// Write the CSV of the current view into `dir`
    pub fn write_export(&self, dir: &Path) -> Result<PathBuf> {
        let loaded = self
            .loaded()
            .ok_or_else(|| Error::InvalidState("no collection loaded".to_string()))?;
        let view = self
            .view
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no view mounted".to_string()))?;
        export::write_export(dir, &loaded.collection_id, view, &loaded.ratings, &loaded.formats)
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.view
            .as_ref()
            .map(|view| navigator::segments(view))
            .unwrap_or_default()
    }

    pub fn navigator_items(&self) -> Vec<NavigatorItem> {
        match (self.view.as_ref(), self.loaded()) {
            (Some(view), Some(loaded)) => navigator::items(view, &loaded.ratings),
            _ => Vec::new(),
        }
    }
}
