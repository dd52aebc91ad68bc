//! Neighbor image prefetching
//!
//! Prefetched images are held in a small FIFO cache; a URI already cached is
//! not fetched again. Failures are logged and forgotten.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::http;

/// Warms images that may be displayed next
#[async_trait]
pub trait Prefetcher: Send + Sync {
    async fn prefetch(&self, uri: &str);
}

/// Prefetcher that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPrefetcher;

#[async_trait]
impl Prefetcher for NoopPrefetcher {
    async fn prefetch(&self, _uri: &str) {}
}

/// Bounded image cache, oldest entry evicted first
#[derive(Debug)]
pub struct ImageCache {
    capacity: usize,
    order: VecDeque<String>,
    images: HashMap<String, Vec<u8>>,
}

impl ImageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            images: HashMap::new(),
        }
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.images.contains_key(uri)
    }

    pub fn get(&self, uri: &str) -> Option<&[u8]> {
        self.images.get(uri).map(Vec::as_slice)
    }

    pub fn insert(&mut self, uri: String, bytes: Vec<u8>) {
        if self.images.contains_key(&uri) {
            self.images.insert(uri, bytes);
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.images.remove(&evicted);
                debug!(uri = %evicted, "Evicted prefetched image");
            }
        }
        self.order.push_back(uri.clone());
        self.images.insert(uri, bytes);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Downloads images over HTTP into an [`ImageCache`]
pub struct HttpPrefetcher {
    http_client: reqwest::Client,
    cache: Mutex<ImageCache>,
}

impl HttpPrefetcher {
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            http_client: http::build_client()?,
            cache: Mutex::new(ImageCache::new(capacity)),
        })
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, ImageCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_cached(&self, uri: &str) -> bool {
        self.cache().contains(uri)
    }

    pub fn cached_image(&self, uri: &str) -> Option<Vec<u8>> {
        self.cache().get(uri).map(<[u8]>::to_vec)
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .get(uri)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let response = http::check_status(response, uri).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Prefetcher for HttpPrefetcher {
    async fn prefetch(&self, uri: &str) {
        if uri.is_empty() || self.is_cached(uri) {
            return;
        }

        match self.download(uri).await {
            Ok(bytes) => {
                debug!(uri, size = bytes.len(), "Prefetched image");
                self.cache().insert(uri.to_string(), bytes);
            }
            Err(e) => warn!(uri, error = %e, "Image prefetch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_evicts_oldest() {
        let mut cache = ImageCache::new(2);
        cache.insert("a".to_string(), vec![1]);
        cache.insert("b".to_string(), vec![2]);
        cache.insert("c".to_string(), vec![3]);

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert_eq!(cache.get("c"), Some(&[3u8][..]));
    }

    #[test]
    fn test_cache_reinsert_does_not_grow() {
        let mut cache = ImageCache::new(2);
        cache.insert("a".to_string(), vec![1]);
        cache.insert("a".to_string(), vec![9]);
        cache.insert("b".to_string(), vec![2]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(&[9u8][..]));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = ImageCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert!(cache.is_empty());
    }
}
