//! Loads external graphics, mark glyph sources and remote style parts.
//!
//! Everything goes through one [`ResourceProvider`]. Raw bytes and decoded
//! bitmaps are kept in two bounded LRU caches so that expression-driven
//! graphics, which resolve a key per feature, fetch each resource once.

use crate::lru_cache::LruCache;
use image::DynamicImage;
use std::fmt;
use std::sync::{Arc, Mutex};
use symbology_traits::{ResourceError, ResourceProvider, SharedResourceData};

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

pub struct ResourceResolver {
    provider: Option<Arc<dyn ResourceProvider>>,
    data: Mutex<LruCache<SharedResourceData>>,
    images: Mutex<LruCache<Arc<DynamicImage>>>,
}

impl ResourceResolver {
    pub fn new(provider: Option<Arc<dyn ResourceProvider>>, capacity: usize) -> Self {
        Self {
            provider,
            data: Mutex::new(LruCache::new(capacity)),
            images: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn ResourceProvider>> {
        self.provider.as_ref()
    }

    fn fetch(&self, key: &str) -> Result<SharedResourceData, ResourceError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| ResourceError::NotFound(format!("{} (no resource provider configured)", key)))?;
        log::debug!("Loading '{}' through {}", key, provider.name());
        provider.load(key)
    }

    /// Bytes stored under `key`.
    pub fn load(&self, key: &str) -> Result<SharedResourceData, ResourceError> {
        let mut cache = self.data.lock().map_err(|_| ResourceError::LoadFailed {
            path: key.to_string(),
            message: "resource cache lock poisoned".to_string(),
        })?;
        if let Some(hit) = cache.get(key) {
            return Ok(hit);
        }
        let data = self.fetch(key)?;
        cache.insert(key, data.clone());
        Ok(data)
    }

    /// The bitmap stored under `key`, decoded once and then served from the cache.
    pub fn image(&self, key: &str) -> Result<Arc<DynamicImage>, ResourceError> {
        let mut cache = self.images.lock().map_err(|_| ResourceError::LoadFailed {
            path: key.to_string(),
            message: "image cache lock poisoned".to_string(),
        })?;
        if let Some(hit) = cache.get(key) {
            return Ok(hit);
        }
        let data = self.fetch(key)?;
        let image = Arc::new(decode_image(key, &data)?);
        cache.insert(key, image.clone());
        Ok(image)
    }

    /// Number of decoded bitmaps currently cached.
    pub fn cached_images(&self) -> usize {
        self.images.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .finish()
    }
}

/// Decodes a bitmap in any of the enabled formats.
pub fn decode_image(key: &str, data: &[u8]) -> Result<DynamicImage, ResourceError> {
    image::load_from_memory(data).map_err(|e| ResourceError::InvalidFormat(format!("{}: {}", key, e)))
}
