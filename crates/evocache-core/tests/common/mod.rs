#![allow(dead_code)]
use std::time::Duration;

use evocache_core::{SetOptions, TaggedCache};

/// Cache with the reference default TTL.
pub fn cache() -> TaggedCache {
    TaggedCache::new(Duration::from_secs(300))
}

/// Seeds A{x}, B{x,y}, C{y} across two namespaces.
pub fn seeded() -> TaggedCache {
    let cache = cache();
    cache.set("feed", "A", "a".to_string(), SetOptions::new().tag("x"));
    cache.set("feed", "B", "b".to_string(), SetOptions::new().tags(["x", "y"]));
    cache.set("profiles", "C", "c".to_string(), SetOptions::new().tag("y"));
    cache
}

/// Installs a test subscriber honoring RUST_LOG; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
