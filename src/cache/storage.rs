use dashmap::DashMap;
use serde::Serialize;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::{
    error::AppError,
    origin::{CacheKey, FetchedResponse},
};

/// Process-wide cache storage, the equivalent of the browser `caches` object.
///
/// Concurrent reads and writes from independent request tasks are safe;
/// there is no cross-cache atomicity.
pub struct CacheStorage {
    caches: DashMap<String, Arc<NamedCache>>,
    next_seq: AtomicU64,
    max_entry_bytes: usize,
}

/// One named cache: request key -> stored response
pub struct NamedCache {
    name: String,
    // Creation order, used to make cross-cache matching deterministic
    seq: u64,
    entries: DashMap<CacheKey, FetchedResponse>,
    max_entry_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    pub name: String,
    pub entries: usize,
    pub urls: Vec<String>,
}

impl CacheStorage {
    pub fn new(max_entry_bytes: usize) -> Self {
        Self {
            caches: DashMap::new(),
            next_seq: AtomicU64::new(0),
            max_entry_bytes,
        }
    }

    /// Open the cache called `name`, creating it when missing
    pub fn open(&self, name: &str) -> Arc<NamedCache> {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(NamedCache {
                    name: name.to_string(),
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    entries: DashMap::new(),
                    max_entry_bytes: self.max_entry_bytes,
                })
            })
            .clone()
    }

    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Cache names in creation order
    pub fn keys(&self) -> Vec<String> {
        self.ordered().into_iter().map(|c| c.name.clone()).collect()
    }

    pub fn delete(&self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// First stored response for `key` across all caches, oldest cache first
    pub fn match_request(&self, key: &CacheKey) -> Option<FetchedResponse> {
        self.ordered().into_iter().find_map(|cache| cache.get(key))
    }

    pub fn summary(&self) -> Vec<CacheSummary> {
        self.ordered()
            .into_iter()
            .map(|cache| {
                let urls: Vec<String> = cache.keys().iter().map(CacheKey::to_string).collect();
                CacheSummary {
                    name: cache.name.clone(),
                    entries: urls.len(),
                    urls,
                }
            })
            .collect()
    }

    fn ordered(&self) -> Vec<Arc<NamedCache>> {
        let mut caches: Vec<_> = self.caches.iter().map(|c| c.value().clone()).collect();
        caches.sort_by_key(|c| c.seq);
        caches
    }
}

impl NamedCache {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &CacheKey) -> Option<FetchedResponse> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Whether `put` would take this response
    pub fn accepts(&self, response: &FetchedResponse) -> bool {
        response.body.len() <= self.max_entry_bytes
    }

    /// Store `response` under `key`, replacing any previous entry
    pub fn put(&self, key: CacheKey, response: FetchedResponse) -> Result<(), AppError> {
        if !self.accepts(&response) {
            return Err(AppError::CacheWrite(format!(
                "{} is {} bytes, limit is {}",
                key,
                response.body.len(),
                self.max_entry_bytes
            )));
        }
        self.entries.insert(key, response);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<_> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn text(body: &'static str) -> FetchedResponse {
        FetchedResponse::new(StatusCode::OK, "text/plain", body)
    }

    #[test]
    fn test_open_is_idempotent() {
        let storage = CacheStorage::new(1024);
        let a = storage.open("geb-static-v1");
        a.put(CacheKey::new("/"), text("shell")).unwrap();

        let b = storage.open("geb-static-v1");
        assert_eq!(b.len(), 1);
        assert_eq!(storage.keys(), vec!["geb-static-v1".to_string()]);
    }

    #[test]
    fn test_put_supersedes_previous_entry() {
        let storage = CacheStorage::new(1024);
        let cache = storage.open("geb-dynamic-v1");
        let key = CacheKey::new("/api/products");

        cache.put(key.clone(), text("old")).unwrap();
        cache.put(key.clone(), text("new")).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap().body, "new");
    }

    #[test]
    fn test_match_searches_caches_in_creation_order() {
        let storage = CacheStorage::new(1024);
        let key = CacheKey::new("/logo.svg");
        storage.open("geb-static-v1").put(key.clone(), text("static")).unwrap();
        storage.open("geb-dynamic-v1").put(key.clone(), text("dynamic")).unwrap();

        assert_eq!(storage.match_request(&key).unwrap().body, "static");
        assert!(storage.match_request(&CacheKey::new("/missing")).is_none());
    }

    #[test]
    fn test_delete_removes_whole_cache() {
        let storage = CacheStorage::new(1024);
        storage.open("geb-static-v0");
        storage.open("geb-static-v1");

        assert!(storage.delete("geb-static-v0"));
        assert!(!storage.delete("geb-static-v0"));
        assert_eq!(storage.keys(), vec!["geb-static-v1".to_string()]);
    }

    #[test]
    fn test_summary_lists_sorted_urls() {
        let storage = CacheStorage::new(1024);
        let cache = storage.open("geb-static-v1");
        cache.put(CacheKey::new("/manifest.json"), text("{}")).unwrap();
        cache.put(CacheKey::new("/"), text("shell")).unwrap();

        let summary = storage.summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].entries, 2);
        assert_eq!(summary[0].urls, vec!["/", "/manifest.json"]);
    }

    #[test]
    fn test_oversized_entry_is_rejected() {
        let storage = CacheStorage::new(4);
        let cache = storage.open("geb-dynamic-v1");

        let result = cache.put(CacheKey::new("/big"), text("too large"));
        assert!(matches!(result, Err(AppError::CacheWrite(_))));
        assert!(cache.is_empty());
    }
}
