//! Memoization of Scopus searches.
//!
//! Results are keyed by the Elsevier API key together with the full search
//! parameters, so a cached report is only served to callers holding the key
//! that fetched it. Entries expire after a caller-chosen time-to-live; an
//! expired entry is dropped when looked up, and every insert sweeps out the
//! rest.

use crate::scopus::{SearchParams, SearchResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    api_key: String,
    params: SearchParams,
}

impl CacheKey {
    fn new(api_key: &str, params: &SearchParams) -> Self {
        Self {
            api_key: api_key.to_string(),
            params: params.clone(),
        }
    }
}

struct CacheEntry {
    stored_at: Instant,
    result: Arc<SearchResult>,
}

/// Search cache shared by dashboard requests
pub struct SearchCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached result for `params` fetched with `api_key`, if still fresh
    pub fn get(&self, api_key: &str, params: &SearchParams) -> Option<Arc<SearchResult>> {
        let key = CacheKey::new(api_key, params);
        let mut entries = self.entries.lock().ok()?;
        let fresh = entries
            .get(&key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.result));

        match fresh {
            Some(result) => {
                debug!(query = %params.query, "Cache hit");
                Some(result)
            }
            None => {
                entries.remove(&key);
                None
            }
        }
    }

    /// Store a result and hand back the shared copy
    pub fn insert(&self, api_key: &str, params: &SearchParams, result: SearchResult) -> Arc<SearchResult> {
        let result = Arc::new(result);
        self.purge_expired();
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                CacheKey::new(api_key, params),
                CacheEntry {
                    stored_at: Instant::now(),
                    result: Arc::clone(&result),
                },
            );
        }
        result
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            let before = entries.len();
            entries.retain(|_, e| e.stored_at.elapsed() < ttl);
            if entries.len() < before {
                debug!(evicted = before - entries.len(), "Purged expired searches");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "key-1";

    fn params(query: &str) -> SearchParams {
        SearchParams {
            query: query.to_string(),
            count: 25,
            max_results: 200,
        }
    }

    fn result(total: usize) -> SearchResult {
        SearchResult {
            total_results: total,
            entries: Vec::new(),
        }
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = SearchCache::new(Duration::from_secs(60));
        assert!(cache.get(KEY, &params("a")).is_none());

        cache.insert(KEY, &params("a"), result(3));
        assert_eq!(cache.get(KEY, &params("a")).map(|r| r.total_results), Some(3));

        let mut other = params("a");
        other.count = 50;
        assert!(cache.get(KEY, &other).is_none());
    }

    #[test]
    fn test_entries_are_scoped_to_api_key() {
        let cache = SearchCache::new(Duration::from_secs(60));
        cache.insert(KEY, &params("a"), result(3));

        assert!(cache.get("key-2", &params("a")).is_none());
        assert!(cache.get("", &params("a")).is_none());
        assert!(cache.get(KEY, &params("a")).is_some());
    }

    #[test]
    fn test_expiry() {
        let cache = SearchCache::new(Duration::ZERO);
        cache.insert(KEY, &params("a"), result(1));
        assert!(cache.get(KEY, &params("a")).is_none());
        assert!(cache.is_empty());

        cache.insert(KEY, &params("b"), result(1));
        cache.purge_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_sweeps_expired_entries() {
        let cache = SearchCache::new(Duration::ZERO);
        for query in ["a", "b", "c"] {
            cache.insert(KEY, &params(query), result(1));
        }
        assert_eq!(cache.len(), 1);
    }
}
