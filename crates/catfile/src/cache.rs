//! The per-session cache of subprocess pairs.
//!
//! The cache is an insertion-ordered sequence, not an LRU: entries are
//! appended at the tail with a fixed TTL and evicted from the head. A hit
//! does not re-sort anything — promoting on access would break the
//! monotone-expiry ordering the head-only sweeper relies on. Checked-out
//! entries leave the sequence entirely; the borrowing request owns the
//! pair until its completion watcher either returns it or closes it.

use crate::metrics::CatfileMetrics;
use crate::pair::BatchPair;
use gitmux_core::{CacheSettings, Repository};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cache key: two requests share a pair iff all five fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoKey {
    session_id: String,
    storage_name: String,
    relative_path: String,
    object_directory: String,
    alternate_directories: String,
}

impl RepoKey {
    /// Build a key from a session id and a repository identity.
    pub fn new(session_id: impl Into<String>, repo: &Repository) -> Self {
        Self {
            session_id: session_id.into(),
            storage_name: repo.storage_name.clone(),
            relative_path: repo.relative_path.clone(),
            object_directory: repo.object_directory().to_string(),
            alternate_directories: repo.alternate_object_directories_joined(),
        }
    }
}

struct CacheEntry {
    key: RepoKey,
    pair: Arc<BatchPair>,
    expiry: Instant,
}

/// Bounded, TTL-governed cache of subprocess pairs.
pub struct SessionCache {
    entries: Mutex<VecDeque<CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
    sweep_interval: Duration,
    metrics: Arc<CatfileMetrics>,
}

impl SessionCache {
    /// Create a cache from resolved settings.
    ///
    /// A zero `max_entries` falls back to the default cap.
    #[must_use]
    pub fn new(settings: &CacheSettings, metrics: Arc<CatfileMetrics>) -> Self {
        let max_entries = if settings.max_entries == 0 {
            CacheSettings::default().max_entries
        } else {
            settings.max_entries
        };

        Self {
            entries: Mutex::new(VecDeque::new()),
            ttl: settings.ttl,
            max_entries,
            sweep_interval: settings.sweep_interval,
            metrics,
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a pair at the tail with a fresh expiry.
    ///
    /// An existing entry under the same key is closed and replaced; head
    /// entries are evicted until the cache fits its cap again.
    pub fn add(&self, key: RepoKey, pair: Arc<BatchPair>) {
        let expiry = Instant::now() + self.ttl;
        let mut entries = self.entries();

        if let Some(index) = entries.iter().position(|e| e.key == key) {
            if let Some(old) = entries.remove(index) {
                old.pair.close();
            }
            self.metrics.record_duplicate();
        }

        entries.push_back(CacheEntry { key, pair, expiry });

        while entries.len() > self.max_entries {
            if let Some(evicted) = entries.pop_front() {
                evicted.pair.close();
                self.metrics.record_eviction();
            }
        }

        self.metrics.set_cache_size(entries.len() as i64);
    }

    /// Remove and return the pair under `key`, if present.
    ///
    /// The caller becomes the pair's exclusive owner; the pair is not
    /// closed.
    pub fn checkout(&self, key: &RepoKey) -> Option<Arc<BatchPair>> {
        let mut entries = self.entries();

        let Some(index) = entries.iter().position(|e| &e.key == key) else {
            self.metrics.record_miss();
            return None;
        };

        let entry = entries.remove(index)?;
        self.metrics.record_hit();
        self.metrics.set_cache_size(entries.len() as i64);
        Some(entry.pair)
    }

    /// Evict every entry whose expiry lies strictly before `now`.
    ///
    /// Expiries are monotone along the sequence (fixed TTL, tail-append),
    /// so checking only the head is sufficient.
    pub fn enforce_ttl(&self, now: Instant) {
        let mut entries = self.entries();

        while let Some(front) = entries.front() {
            if front.expiry >= now {
                break;
            }
            if let Some(expired) = entries.pop_front() {
                expired.pair.close();
                self.metrics.record_eviction();
            }
        }

        self.metrics.set_cache_size(entries.len() as i64);
    }

    /// Close and remove every entry.
    pub fn evict_all(&self) {
        let mut entries = self.entries();
        while let Some(entry) = entries.pop_front() {
            entry.pair.close();
            self.metrics.record_eviction();
        }
        self.metrics.set_cache_size(0);
    }

    /// Current number of cached pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Run the TTL sweeper until `shutdown` fires.
    ///
    /// One sweeper per cache; without a shutdown signal it runs for the
    /// life of the process.
    pub fn start_sweeper(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(cache.sweep_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => cache.enforce_ttl(Instant::now()),
                    () = shutdown.cancelled() => break,
                }
            }
        })
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache(ttl: Duration, max_entries: usize) -> (SessionCache, Arc<CatfileMetrics>) {
        let metrics = Arc::new(CatfileMetrics::new());
        let settings = CacheSettings {
            ttl,
            max_entries,
            sweep_interval: Duration::from_millis(10),
        };
        (SessionCache::new(&settings, Arc::clone(&metrics)), metrics)
    }

    fn test_key(session: &str) -> RepoKey {
        let repo = Repository::new("default", "group/project.git", "/srv/project.git");
        RepoKey::new(session, &repo)
    }

    fn test_pair() -> Arc<BatchPair> {
        let (pair, _batch, _check) = BatchPair::for_tests();
        pair
    }

    #[tokio::test]
    async fn test_checkout_after_add_returns_same_pair() {
        let (cache, metrics) = test_cache(Duration::from_secs(10), 10);
        let key = test_key("s1");
        let pair = test_pair();

        cache.add(key.clone(), Arc::clone(&pair));
        assert_eq!(cache.len(), 1);
        assert_eq!(metrics.cache_size(), 1);

        let checked_out = cache.checkout(&key).expect("hit");
        assert!(Arc::ptr_eq(&checked_out, &pair));
        assert!(!checked_out.is_closed());
        assert_eq!(cache.len(), 0);
        assert_eq!(metrics.hits(), 1);
        assert_eq!(metrics.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_checkout_miss_counts() {
        let (cache, metrics) = test_cache(Duration::from_secs(10), 10);
        assert!(cache.checkout(&test_key("nope")).is_none());
        assert_eq!(metrics.misses(), 1);
        assert_eq!(metrics.hits(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_add_closes_old_pair() {
        let (cache, metrics) = test_cache(Duration::from_secs(10), 10);
        let key = test_key("s1");
        let first = test_pair();
        let second = test_pair();

        cache.add(key.clone(), Arc::clone(&first));
        cache.add(key.clone(), Arc::clone(&second));

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_eq!(cache.len(), 1);
        assert_eq!(metrics.duplicates(), 1);

        let checked_out = cache.checkout(&key).expect("hit");
        assert!(Arc::ptr_eq(&checked_out, &second));
    }

    #[tokio::test]
    async fn test_capacity_overflow_evicts_from_head() {
        let (cache, metrics) = test_cache(Duration::from_secs(10), 2);
        let (key_a, key_b, key_c) = (test_key("a"), test_key("b"), test_key("c"));
        let (pair_a, pair_b, pair_c) = (test_pair(), test_pair(), test_pair());

        cache.add(key_a.clone(), Arc::clone(&pair_a));
        cache.add(key_b.clone(), Arc::clone(&pair_b));
        cache.add(key_c.clone(), Arc::clone(&pair_c));

        assert_eq!(cache.len(), 2);
        assert_eq!(metrics.evictions(), 1);
        assert!(pair_a.is_closed());
        assert!(!pair_b.is_closed());
        assert!(!pair_c.is_closed());

        // remaining entries are {B, C}, in insertion order
        assert!(cache.checkout(&key_a).is_none());
        assert!(cache.checkout(&key_b).is_some());
        assert!(cache.checkout(&key_c).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforce_ttl_is_strict() {
        let (cache, metrics) = test_cache(Duration::from_secs(10), 10);
        let key = test_key("s1");
        let pair = test_pair();
        cache.add(key.clone(), Arc::clone(&pair));

        // the clock is paused, so this is exactly the entry's expiry
        let expiry = Instant::now() + Duration::from_secs(10);
        cache.enforce_ttl(expiry);
        assert_eq!(cache.len(), 1);
        assert!(!pair.is_closed());

        // one tick past it, the entry goes
        cache.enforce_ttl(expiry + Duration::from_millis(1));
        assert_eq!(cache.len(), 0);
        assert!(pair.is_closed());
        assert_eq!(metrics.evictions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforce_ttl_stops_at_first_live_entry() {
        let (cache, _metrics) = test_cache(Duration::from_secs(10), 10);
        let old_pair = test_pair();
        cache.add(test_key("old"), Arc::clone(&old_pair));

        tokio::time::sleep(Duration::from_secs(5)).await;

        let young_pair = test_pair();
        cache.add(test_key("young"), Arc::clone(&young_pair));

        cache.enforce_ttl(Instant::now() + Duration::from_secs(6));
        assert!(old_pair.is_closed());
        assert!(!young_pair.is_closed());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_all_closes_everything() {
        let (cache, metrics) = test_cache(Duration::from_secs(10), 10);
        let pairs: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|s| {
                let pair = test_pair();
                cache.add(test_key(s), Arc::clone(&pair));
                pair
            })
            .collect();

        cache.evict_all();
        assert!(cache.is_empty());
        assert_eq!(metrics.cache_size(), 0);
        assert_eq!(metrics.evictions(), 3);
        assert!(pairs.iter().all(|p| p.is_closed()));
    }

    #[tokio::test]
    async fn test_zero_max_entries_falls_back_to_default() {
        let (cache, _metrics) = test_cache(Duration::from_secs(10), 0);
        assert_eq!(cache.max_entries, CacheSettings::default().max_entries);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_expired_entries() {
        let metrics = Arc::new(CatfileMetrics::new());
        let settings = CacheSettings {
            ttl: Duration::from_millis(50),
            max_entries: 10,
            sweep_interval: Duration::from_millis(10),
        };
        let cache = Arc::new(SessionCache::new(&settings, metrics));
        let shutdown = CancellationToken::new();
        let sweeper = cache.start_sweeper(shutdown.clone());

        let pair = test_pair();
        cache.add(test_key("s"), Arc::clone(&pair));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.is_empty());
        assert!(pair.is_closed());

        shutdown.cancel();
        sweeper.await.expect("sweeper");
    }
}
