//! Stored entries and insertion options.

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Type-erased payload shared between the cache and its readers.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// A value stored in one namespace, with its expiry and tags.
pub(crate) struct CacheEntry {
    pub(crate) data: Payload,
    pub(crate) stored_at: Instant,
    pub(crate) ttl: Duration,
    pub(crate) tags: BTreeSet<String>,
}

impl CacheEntry {
    pub(crate) fn new(data: Payload, ttl: Duration, tags: BTreeSet<String>) -> Self {
        Self {
            data,
            stored_at: Instant::now(),
            ttl,
            tags,
        }
    }

    /// An entry is still valid when exactly `ttl` has elapsed, expired strictly after.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

/// Options for [`TaggedCache::set`](crate::TaggedCache::set).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use evocache_core::SetOptions;
///
/// let options = SetOptions::new()
///     .ttl(Duration::from_secs(30))
///     .tag("posts")
///     .tags(["user:42", "feed"]);
///
/// assert_eq!(options.get_ttl(), Some(Duration::from_secs(30)));
/// assert_eq!(options.get_tags().len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    ttl: Option<Duration>,
    tags: BTreeSet<String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the cache's default TTL for this entry.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Adds one tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Adds several tags. Duplicates collapse.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn get_ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn get_tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub(crate) fn into_parts(self) -> (Option<Duration>, BTreeSet<String>) {
        (self.ttl, self.tags)
    }
}
