//! Cache metrics recording.

use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Registra las metricas de cache.
/// Llamar una vez al inicio, despues de instalar el recorder.
pub fn register_cache_metrics() {
    metrics::describe_counter!("evocache_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!(
        "evocache_cache_misses_total",
        "Total number of cache misses"
    );
    metrics::describe_counter!(
        "evocache_cache_evictions_total",
        "Total number of entries removed from the cache, by reason"
    );
    metrics::describe_gauge!(
        "evocache_cache_entries",
        "Current number of entries in cache, including expired ones not yet swept"
    );
    metrics::describe_histogram!(
        "evocache_cache_operation_seconds",
        "Time spent on cache operations"
    );
    metrics::describe_counter!(
        "evocache_coalesced_total",
        "Requests that joined an in-flight producer instead of starting one"
    );
    metrics::describe_counter!(
        "evocache_producer_runs_total",
        "Producer invocations started by the request coalescer"
    );
}

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Found expired on read.
    Expired,
    /// Removed by `delete`.
    Explicit,
    /// Removed by tag invalidation.
    Tag,
    /// Removed by glob pattern invalidation.
    Pattern,
    /// Removed by the periodic sweep.
    Sweep,
    /// Removed by `clear` or `clear_all`.
    Cleared,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Explicit => "explicit",
            Self::Tag => "tag",
            Self::Pattern => "pattern",
            Self::Sweep => "sweep",
            Self::Cleared => "cleared",
        }
    }
}

/// Recorder de metricas de cache.
/// Usa atomic counters internos para el hit rate local.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registra un cache hit
    pub fn record_hit(&self, namespace: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("evocache_cache_hits_total", "namespace" => namespace.to_string()).increment(1);
    }

    /// Registra un cache miss
    pub fn record_miss(&self, namespace: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("evocache_cache_misses_total", "namespace" => namespace.to_string())
            .increment(1);
    }

    /// Registra entries removidas
    pub fn record_evictions(&self, reason: EvictionReason, count: usize) {
        if count == 0 {
            return;
        }
        counter!("evocache_cache_evictions_total", "reason" => reason.as_str())
            .increment(count as u64);
    }

    /// Actualiza el gauge de entries
    pub fn update_entry_count(&self, count: usize) {
        gauge!("evocache_cache_entries").set(count as f64);
    }

    /// Registra la duracion de una operacion
    pub fn record_operation_duration(&self, operation: &'static str, duration: Duration) {
        histogram!("evocache_cache_operation_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }

    /// Helper para medir tiempo de operacion
    pub fn time_operation<T, F: FnOnce() -> T>(&self, operation: &'static str, f: F) -> T {
        let start = Instant::now();
        let result = f();
        self.record_operation_duration(operation, start.elapsed());
        result
    }

    /// Calcula hit rate (para logging/debugging)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_metrics_hit_rate() {
        let metrics = CacheMetrics::new();

        // 3 hits, 1 miss = 75% hit rate
        metrics.record_hit("feed");
        metrics.record_hit("feed");
        metrics.record_hit("profiles");
        metrics.record_miss("feed");

        let rate = metrics.hit_rate();
        assert!((rate - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_hit_rate_without_traffic() {
        assert_eq!(CacheMetrics::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = CacheMetrics::new();
        let clone = metrics.clone();

        clone.record_miss("feed");
        metrics.record_hit("feed");

        assert_eq!(metrics.hits(), 1);
        assert_eq!(metrics.misses(), 1);
    }

    #[test]
    fn test_operation_timing() {
        let metrics = CacheMetrics::new();
        let result = metrics.time_operation("test_op", || 42);
        assert_eq!(result, 42);
    }

    #[test]
    fn test_eviction_reason_labels() {
        assert_eq!(EvictionReason::Sweep.as_str(), "sweep");
        assert_eq!(EvictionReason::Tag.as_str(), "tag");
        // zero counts are ignored
        CacheMetrics::new().record_evictions(EvictionReason::Expired, 0);
    }
}
