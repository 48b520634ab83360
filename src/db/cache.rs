use moka::policy::EvictionPolicy;
use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::models::MediaType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Signature of one outbound catalog request
    Request(String),
    TitleSearch { media_type: MediaType, query: String },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Request(signature) => write!(f, "req:{}", signature),
            CacheKey::TitleSearch { media_type, query } => {
                write!(f, "search:{}_{}", media_type, query.trim().to_lowercase())
            }
        }
    }
}

/// Whether a lookup may be answered from the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    #[default]
    Prefer,
    /// Always miss, but still store whatever gets fetched
    Bypass,
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub payload: V,
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// In-process response cache with a fixed TTL and a bounded entry count
///
/// Eviction is least-recently-used (access order). Entries older than the TTL
/// are never returned, even if the background expiry has not run yet.
#[derive(Clone)]
pub struct ResponseCache<V> {
    entries: moka::sync::Cache<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V> ResponseCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let entries = moka::sync::Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { entries, ttl }
    }

    /// Returns the stored payload if present and still fresh
    pub fn get(&self, key: &CacheKey, policy: CachePolicy) -> Option<V> {
        if policy == CachePolicy::Bypass {
            tracing::debug!(key = %key, "Cache bypassed");
            return None;
        }

        let key = key.to_string();
        match self.entries.get(&key) {
            Some(entry) if entry.is_fresh(self.ttl) => Some(entry.payload),
            Some(_) => {
                self.entries.invalidate(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &CacheKey, payload: V) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Entry count after pending evictions have been applied
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_key(signature: &str) -> CacheKey {
        CacheKey::Request(signature.to_string())
    }

    #[test]
    fn test_cache_key_display_request() {
        let key = request_key("GET https://api.jikan.moe/v4/anime?genres=1");
        assert_eq!(
            format!("{}", key),
            "req:GET https://api.jikan.moe/v4/anime?genres=1"
        );
    }

    #[test]
    fn test_cache_key_display_title_search_normalized() {
        let key = CacheKey::TitleSearch {
            media_type: MediaType::Manga,
            query: "  One PIECE ".to_string(),
        };
        assert_eq!(format!("{}", key), "search:manga_one piece");
    }

    #[test]
    fn test_get_after_put_returns_payload() {
        let cache = ResponseCache::new(10, Duration::from_secs(60));
        let key = request_key("a");
        cache.put(&key, vec!["Naruto".to_string()]);

        assert_eq!(
            cache.get(&key, CachePolicy::Prefer),
            Some(vec!["Naruto".to_string()])
        );
    }

    #[test]
    fn test_cache_miss() {
        let cache: ResponseCache<String> = ResponseCache::new(10, Duration::from_secs(60));
        assert_eq!(cache.get(&request_key("missing"), CachePolicy::Prefer), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = ResponseCache::new(10, Duration::from_millis(50));
        let key = request_key("short-lived");
        cache.put(&key, 42u32);
        assert_eq!(cache.get(&key, CachePolicy::Prefer), Some(42));

        std::thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.get(&key, CachePolicy::Prefer), None);
    }

    #[test]
    fn test_bypass_forces_miss_but_keeps_entry() {
        let cache = ResponseCache::new(10, Duration::from_secs(60));
        let key = request_key("refresh");
        cache.put(&key, "stale".to_string());

        assert_eq!(cache.get(&key, CachePolicy::Bypass), None);
        assert_eq!(
            cache.get(&key, CachePolicy::Prefer),
            Some("stale".to_string())
        );
    }

    #[test]
    fn test_put_overwrites_existing_entry() {
        let cache = ResponseCache::new(10, Duration::from_secs(60));
        let key = request_key("same");
        cache.put(&key, 1u32);
        cache.put(&key, 2u32);

        assert_eq!(cache.get(&key, CachePolicy::Prefer), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = ResponseCache::new(3, Duration::from_secs(60));
        for i in 0..10 {
            cache.put(&request_key(&format!("k{}", i)), i);
        }

        assert!(cache.len() <= 3);
        assert_eq!(cache.get(&request_key("k9"), CachePolicy::Prefer), Some(9));
    }
}
