//! mtgr-rater library interface
//!
//! Client-side rating state synchronization: catalog resolution, ratings
//! reconciliation, navigation with prefetch and hover preview, rating
//! submission, filtering and export. The `mtgr-rater` binary is a thin
//! command-line front end over [`RaterSession`].

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
mod http;
pub mod navigation;
pub mod ratings;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod submission;

pub use crate::error::{Error, Result};
pub use crate::session::{CollectionLoader, LoadState, LoadedCollection, RaterSession};

use mtgr_common::events::EventBus;
use std::sync::Arc;
use tracing::info;

use crate::backend::HttpRatingsBackend;
use crate::catalog::ScryfallClient;
use crate::config::RaterConfig;
use crate::navigation::{resolver_for_language, HttpPrefetcher, NavigationDeps};
use crate::store::LocalRatingStore;

/// Wire the HTTP clients, rating cache and navigation collaborators
pub fn build_session(config: &RaterConfig, events: EventBus) -> Result<RaterSession> {
    let scryfall = Arc::new(ScryfallClient::new(&config.scryfall_url, config.page_interval)?);
    let backend = Arc::new(HttpRatingsBackend::new(&config.backend_url)?);
    let store = Arc::new(LocalRatingStore::open_file(config.storage_path()));

    info!(
        durable = store.is_durable(),
        path = %config.storage_path().display(),
        "Local rating cache ready"
    );

    let loader = CollectionLoader::new(scryfall.clone(), backend, store, events.clone())
        .with_set_order(config.apply_set_order)
        .with_disabled_formats(config.disabled_formats.clone());

    let deps = NavigationDeps {
        resolver: resolver_for_language(scryfall, &config.language),
        prefetcher: Arc::new(HttpPrefetcher::new(config.prefetch_cache_size)?),
        events,
        preview_delay: config.preview_delay,
    };

    Ok(RaterSession::new(loader, deps))
}
