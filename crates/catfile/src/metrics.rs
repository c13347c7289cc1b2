//! Catfile Metrics
//!
//! Counters and gauges for the subprocess-pair cache and the lookup
//! surface. Exposed in a format compatible with Prometheus.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Which lookup operation a caller invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Metadata-only lookup
    Info,
    /// Commit body lookup
    Commit,
    /// Tree body lookup
    Tree,
    /// Blob body lookup
    Blob,
    /// Tag body lookup
    Tag,
}

impl LookupKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }

    const ALL: [Self; 5] = [Self::Info, Self::Commit, Self::Tree, Self::Blob, Self::Tag];
}

/// Counters by lookup kind
#[derive(Debug, Default)]
struct LookupCounters {
    info: AtomicU64,
    commit: AtomicU64,
    tree: AtomicU64,
    blob: AtomicU64,
    tag: AtomicU64,
}

impl LookupCounters {
    fn increment(&self, kind: LookupKind) {
        self.counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self, kind: LookupKind) -> u64 {
        self.counter(kind).load(Ordering::Relaxed)
    }

    fn counter(&self, kind: LookupKind) -> &AtomicU64 {
        match kind {
            LookupKind::Info => &self.info,
            LookupKind::Commit => &self.commit,
            LookupKind::Tree => &self.tree,
            LookupKind::Blob => &self.blob,
            LookupKind::Tag => &self.tag,
        }
    }
}

/// Catfile metrics collector
#[derive(Debug, Default)]
pub struct CatfileMetrics {
    /// Current number of cached subprocess pairs
    cache_size: AtomicI64,
    /// Checkouts that found a cached pair
    hits: AtomicU64,
    /// Checkouts that found nothing
    misses: AtomicU64,
    /// Adds that replaced an existing entry for the same key
    duplicates: AtomicU64,
    /// Pairs closed by TTL, capacity or flush eviction
    evictions: AtomicU64,
    /// Pairs closed because they came back with unread data
    dirty: AtomicU64,
    /// Lookup calls by kind
    lookups: LookupCounters,
    /// Subprocesses spawned over the process lifetime
    processes_total: AtomicU64,
    /// Subprocesses currently alive
    processes_current: AtomicI64,
}

impl CatfileMetrics {
    /// Create a new metrics collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a duplicate-replace on add
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eviction
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a pair closed dirty at context completion
    pub fn record_dirty(&self) {
        self.dirty.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup call
    pub fn record_lookup(&self, kind: LookupKind) {
        self.lookups.increment(kind);
    }

    /// Record a subprocess spawn
    pub fn record_process_spawned(&self) {
        self.processes_total.fetch_add(1, Ordering::Relaxed);
        self.processes_current.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a subprocess exit
    pub fn record_process_exited(&self) {
        self.processes_current.fetch_sub(1, Ordering::Relaxed);
    }

    /// Set the cache size gauge
    pub fn set_cache_size(&self, size: i64) {
        self.cache_size.store(size, Ordering::Relaxed);
    }

    /// Current cache size gauge value
    #[must_use]
    pub fn cache_size(&self) -> i64 {
        self.cache_size.load(Ordering::Relaxed)
    }

    /// Total cache hits
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total cache misses
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Total duplicate-replaces
    #[must_use]
    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    /// Total evictions
    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Total dirty closes
    #[must_use]
    pub fn dirty(&self) -> u64 {
        self.dirty.load(Ordering::Relaxed)
    }

    /// Total lookups of one kind
    #[must_use]
    pub fn lookups(&self, kind: LookupKind) -> u64 {
        self.lookups.get(kind)
    }

    /// Total subprocesses spawned
    #[must_use]
    pub fn processes_total(&self) -> u64 {
        self.processes_total.load(Ordering::Relaxed)
    }

    /// Subprocesses currently alive
    #[must_use]
    pub fn processes_current(&self) -> i64 {
        self.processes_current.load(Ordering::Relaxed)
    }

    /// Export metrics in Prometheus format
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP gitmux_catfile_cache_size Current number of cached cat-file pairs\n");
        output.push_str("# TYPE gitmux_catfile_cache_size gauge\n");
        output.push_str(&format!("gitmux_catfile_cache_size {}\n", self.cache_size()));

        output.push_str("# HELP gitmux_catfile_cache_hit_total Total cache checkout hits\n");
        output.push_str("# TYPE gitmux_catfile_cache_hit_total counter\n");
        output.push_str(&format!("gitmux_catfile_cache_hit_total {}\n", self.hits()));

        output.push_str("# HELP gitmux_catfile_cache_miss_total Total cache checkout misses\n");
        output.push_str("# TYPE gitmux_catfile_cache_miss_total counter\n");
        output.push_str(&format!("gitmux_catfile_cache_miss_total {}\n", self.misses()));

        output.push_str("# HELP gitmux_catfile_cache_duplicate_total Total cache adds that replaced an entry\n");
        output.push_str("# TYPE gitmux_catfile_cache_duplicate_total counter\n");
        output.push_str(&format!(
            "gitmux_catfile_cache_duplicate_total {}\n",
            self.duplicates()
        ));

        output.push_str("# HELP gitmux_catfile_cache_evicted_total Total pairs evicted from the cache\n");
        output.push_str("# TYPE gitmux_catfile_cache_evicted_total counter\n");
        output.push_str(&format!(
            "gitmux_catfile_cache_evicted_total {}\n",
            self.evictions()
        ));

        output.push_str("# HELP gitmux_catfile_cache_dirty_total Total pairs closed dirty at request completion\n");
        output.push_str("# TYPE gitmux_catfile_cache_dirty_total counter\n");
        output.push_str(&format!("gitmux_catfile_cache_dirty_total {}\n", self.dirty()));

        output.push_str("# HELP gitmux_catfile_lookups_total Total lookup calls by kind\n");
        output.push_str("# TYPE gitmux_catfile_lookups_total counter\n");
        for kind in LookupKind::ALL {
            output.push_str(&format!(
                "gitmux_catfile_lookups_total{{kind=\"{}\"}} {}\n",
                kind.as_str(),
                self.lookups(kind)
            ));
        }

        output.push_str("# HELP gitmux_catfile_processes_total Total cat-file subprocesses spawned\n");
        output.push_str("# TYPE gitmux_catfile_processes_total counter\n");
        output.push_str(&format!(
            "gitmux_catfile_processes_total {}\n",
            self.processes_total()
        ));

        output.push_str("# HELP gitmux_catfile_processes_current Cat-file subprocesses currently alive\n");
        output.push_str("# TYPE gitmux_catfile_processes_current gauge\n");
        output.push_str(&format!(
            "gitmux_catfile_processes_current {}\n",
            self.processes_current()
        ));

        output
    }
}

/// Global metrics instance
static GLOBAL_METRICS: OnceLock<Arc<CatfileMetrics>> = OnceLock::new();

/// Get or initialize the global catfile metrics
#[must_use]
pub fn global_metrics() -> Arc<CatfileMetrics> {
    GLOBAL_METRICS
        .get_or_init(|| Arc::new(CatfileMetrics::new()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = CatfileMetrics::new();
        assert_eq!(metrics.hits(), 0);
        assert_eq!(metrics.misses(), 0);
        assert_eq!(metrics.cache_size(), 0);
        assert_eq!(metrics.processes_current(), 0);
    }

    #[test]
    fn test_record_lookups_by_kind() {
        let metrics = CatfileMetrics::new();
        metrics.record_lookup(LookupKind::Blob);
        metrics.record_lookup(LookupKind::Blob);
        metrics.record_lookup(LookupKind::Info);
        assert_eq!(metrics.lookups(LookupKind::Blob), 2);
        assert_eq!(metrics.lookups(LookupKind::Info), 1);
        assert_eq!(metrics.lookups(LookupKind::Tree), 0);
    }

    #[test]
    fn test_process_gauge_tracks_spawn_and_exit() {
        let metrics = CatfileMetrics::new();
        metrics.record_process_spawned();
        metrics.record_process_spawned();
        metrics.record_process_exited();
        assert_eq!(metrics.processes_total(), 2);
        assert_eq!(metrics.processes_current(), 1);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = CatfileMetrics::new();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_lookup(LookupKind::Tag);

        let output = metrics.to_prometheus();
        assert!(output.contains("gitmux_catfile_cache_hit_total 1"));
        assert!(output.contains("gitmux_catfile_cache_miss_total 1"));
        assert!(output.contains("gitmux_catfile_lookups_total{kind=\"tag\"} 1"));
        assert!(output.contains("# TYPE gitmux_catfile_cache_size gauge"));
    }
}
