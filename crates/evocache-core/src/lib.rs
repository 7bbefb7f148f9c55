//! # Evocache Core
//!
//! In-process cache for expensive, round-trip-bound lookups.
//!
//! Values live in named namespaces, each entry carrying its own TTL and a set
//! of tags. Reads check expiry lazily, so a stale entry is never returned even
//! if no sweep has run. Tags allow bulk invalidation across namespaces: when a
//! new post is published, invalidating `"posts"` drops every cached feed page
//! at once.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use evocache_core::{SetOptions, TaggedCache};
//!
//! let cache = TaggedCache::new(Duration::from_secs(300));
//!
//! cache.set("feed", "page-1", vec!["post-1", "post-2"], SetOptions::new().tag("posts"));
//! cache.set(
//!     "profiles",
//!     "owner-1",
//!     "alice".to_string(),
//!     SetOptions::new().ttl(Duration::from_secs(60)).tag("user:owner-1"),
//! );
//!
//! assert!(cache.has("feed", "page-1"));
//! assert_eq!(cache.invalidate_by_tag("posts"), 1);
//! assert!(!cache.has("feed", "page-1"));
//! ```

mod cache;
mod entry;
pub mod error;
mod invalidation;
mod keys;
pub mod metrics;
pub mod settings;
mod stats;
mod tags;

// Re-exports
pub use cache::TaggedCache;
pub use entry::SetOptions;
pub use error::{Result, SettingsError};
pub use keys::EntryId;
pub use metrics::{CacheMetrics, EvictionReason, register_cache_metrics};
pub use settings::CacheSettings;
pub use stats::{CacheStats, NamespaceStats};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }
}
