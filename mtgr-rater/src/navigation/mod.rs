//! Card navigation: position, image resolution, prefetch and hover preview

mod art;
mod engine;
pub mod navigator;
mod prefetch;
mod preview;

pub use art::{resolver_for_language, ArtResolver, CatalogArtResolver, LocalizedArtResolver};
pub use engine::{DisplayedCard, NavigationDeps, NavigationEngine, PreviewTarget};
pub use navigator::{Segment, Swatch};
pub use prefetch::{HttpPrefetcher, ImageCache, NoopPrefetcher, Prefetcher};
pub use preview::PreviewOverride;
