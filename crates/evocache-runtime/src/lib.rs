//! # Evocache Runtime
//!
//! Async companions for [`evocache_core::TaggedCache`]:
//!
//! - [`RequestCoalescer`]: at most one producer in flight per key, results
//!   memoized in a cache namespace with TTL and tags
//! - [`ExpirySweeper`]: background task purging expired entries
//! - [`memoize`]: wraps an async function with the coalescer
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use evocache_core::{CacheSettings, TaggedCache};
//! use evocache_runtime::{ExpirySweeper, RequestCoalescer, RunOptions, SweeperConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let settings = CacheSettings::default();
//! let cache = TaggedCache::from_settings(&settings);
//! let sweeper = ExpirySweeper::new(cache.clone(), SweeperConfig::from(&settings)).start();
//!
//! let feed = RequestCoalescer::new(cache.clone(), "feed");
//! let page = feed
//!     .run(
//!         "page-1",
//!         || async { Ok::<_, String>(vec!["post-1".to_string()]) },
//!         RunOptions::new().ttl(Duration::from_secs(30)).tag("posts"),
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(page.len(), 1);
//!
//! // A new post invalidates every cached feed page.
//! assert_eq!(cache.invalidate_by_tag("posts"), 1);
//!
//! sweeper.stop_and_wait().await;
//! # }
//! ```

pub mod coalescer;
pub mod memoize;
pub mod sweeper;

// Re-exports
pub use coalescer::{RequestCoalescer, RunOptions};
pub use memoize::{Memoized, json_key, memoize, memoize_with_key};
pub use sweeper::{ExpirySweeper, SweepState, SweeperConfig, SweeperHandle};

// Re-export evocache_core for consumers
pub use evocache_core;
