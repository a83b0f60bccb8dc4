//! LRU playlist cache
//!
//! Synthesized master playlists are deterministic for a given media id and
//! default audio index, so the rendered bytes can be reused until evicted.

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::CacheConfig;

/// Cache key: media id and requested default audio index
pub type PlaylistKey = (String, Option<usize>);

/// LRU cache for rendered master playlists
pub struct PlaylistCache {
    entries: Mutex<LruCache<PlaylistKey, Bytes>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlaylistCache {
    /// Create a cache holding at most `config.max_entries` playlists
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached playlist, marking it recently used
    pub fn get(&self, media_id: &str, audio: Option<usize>) -> Option<Bytes> {
        let key = (media_id.to_string(), audio);
        let found = self.entries.lock().get(&key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn insert(&self, media_id: &str, audio: Option<usize>, data: Bytes) {
        self.entries.lock().put((media_id.to_string(), audio), data);
    }

    /// Drop every playlist of one media id
    pub fn remove_media(&self, media_id: &str) -> usize {
        let mut entries = self.entries.lock();
        let keys: Vec<PlaylistKey> = entries
            .iter()
            .filter(|((id, _), _)| id == media_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            entries.pop(key);
        }
        keys.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> PlaylistCacheStats {
        let entries = self.entries.lock();
        PlaylistCacheStats {
            entry_count: entries.len(),
            capacity: entries.cap().get(),
            total_size_bytes: entries.iter().map(|(_, data)| data.len()).sum(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlaylistCacheStats {
    pub entry_count: usize,
    pub capacity: usize,
    pub total_size_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}
