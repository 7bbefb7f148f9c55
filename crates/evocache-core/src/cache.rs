//! Namespaced TTL cache with tag annotations.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::entry::{CacheEntry, Payload, SetOptions};
use crate::keys::EntryId;
use crate::metrics::{CacheMetrics, EvictionReason};
use crate::settings::CacheSettings;
use crate::stats::{CacheStats, NamespaceStats};
use crate::tags::TagIndex;

/// Everything guarded by the cache lock.
#[derive(Default)]
pub(crate) struct CacheState {
    pub(crate) namespaces: HashMap<String, HashMap<String, CacheEntry>>,
    pub(crate) tags: TagIndex,
}

impl CacheState {
    /// The single removal path: drops the entry and detaches its tags.
    pub(crate) fn remove(&mut self, namespace: &str, key: &str) -> Option<CacheEntry> {
        let entry = self.namespaces.get_mut(namespace)?.remove(key)?;
        let id = EntryId::new(namespace, key);
        self.tags.detach(&id, &entry.tags);
        Some(entry)
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }

    pub(crate) fn ids(&self) -> Vec<EntryId> {
        self.namespaces
            .iter()
            .flat_map(|(namespace, entries)| {
                entries.keys().map(move |key| EntryId::new(namespace, key))
            })
            .collect()
    }
}

/// Cache de valores arbitrarios agrupados por namespace.
/// Thread-safe: un solo lock por instancia protege entries e indice de tags.
///
/// Clones share the same underlying storage, so one instance can be handed
/// to every consumer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use evocache_core::{SetOptions, TaggedCache};
///
/// let cache = TaggedCache::new(Duration::from_secs(300));
/// cache.set("profiles", "owner-1", "alice".to_string(), SetOptions::new().tag("user:owner-1"));
///
/// assert_eq!(cache.get::<String>("profiles", "owner-1").as_deref(), Some("alice"));
/// assert_eq!(cache.invalidate_by_tag("user:owner-1"), 1);
/// assert!(!cache.has("profiles", "owner-1"));
/// ```
#[derive(Clone)]
pub struct TaggedCache {
    pub(crate) state: Arc<Mutex<CacheState>>,
    default_ttl: Duration,
    pub(crate) metrics: CacheMetrics,
}

impl TaggedCache {
    /// Crea un cache vacio con el TTL por defecto dado.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            default_ttl,
            metrics: CacheMetrics::new(),
        }
    }

    /// Crea un cache a partir de los settings cargados.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.default_ttl())
    }

    /// TTL applied when [`SetOptions`] carries none.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Inserts or overwrites the entry for `(namespace, key)`.
    ///
    /// Tags of a replaced entry are detached before the new ones are attached.
    pub fn set<T>(&self, namespace: &str, key: &str, value: T, options: SetOptions)
    where
        T: Send + Sync + 'static,
    {
        let (ttl, tags) = options.into_parts();
        let entry = CacheEntry::new(Arc::new(value), ttl.unwrap_or(self.default_ttl), tags);
        let id = EntryId::new(namespace, key);

        let mut state = self.state.lock();
        if let Some(previous) = state.remove(namespace, key) {
            debug!(namespace = %namespace, key = %key, tags = previous.tags.len(), "Replacing cache entry");
        }
        state.tags.attach(&id, &entry.tags);
        state
            .namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), entry);

        self.metrics.update_entry_count(state.entry_count());
    }

    /// Obtiene un valor si existe y no ha expirado.
    ///
    /// An expired entry is removed on the spot. An entry stored with a
    /// different type is reported as a miss and left in place.
    pub fn get<T>(&self, namespace: &str, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let payload = self.lookup(namespace, key)?;
        match payload.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                warn!(
                    namespace = %namespace,
                    key = %key,
                    expected = std::any::type_name::<T>(),
                    "Cache entry holds a different type, treating as miss"
                );
                None
            },
        }
    }

    /// Returns true if a live entry exists. Expired entries are removed.
    pub fn has(&self, namespace: &str, key: &str) -> bool {
        self.lookup(namespace, key).is_some()
    }

    fn lookup(&self, namespace: &str, key: &str) -> Option<Payload> {
        self.metrics.time_operation("get", || {
            let mut state = self.state.lock();
            let now = Instant::now();

            match state.namespaces.get(namespace).and_then(|ns| ns.get(key)) {
                Some(entry) if !entry.is_expired(now) => {
                    let data = Arc::clone(&entry.data);
                    self.metrics.record_hit(namespace);
                    return Some(data);
                },
                Some(_) => {
                    state.remove(namespace, key);
                    debug!(namespace = %namespace, key = %key, "Expired cache entry removed on read");
                    self.metrics.record_evictions(EvictionReason::Expired, 1);
                    self.metrics.update_entry_count(state.entry_count());
                },
                None => {},
            }

            self.metrics.record_miss(namespace);
            None
        })
    }

    /// Removes an entry. Returns whether something was removed.
    pub fn delete(&self, namespace: &str, key: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.remove(namespace, key).is_some();
        if removed {
            self.metrics.record_evictions(EvictionReason::Explicit, 1);
            self.metrics.update_entry_count(state.entry_count());
        }
        removed
    }

    /// Removes every entry of a namespace, and the namespace itself.
    pub fn clear(&self, namespace: &str) {
        let mut state = self.state.lock();
        let Some(entries) = state.namespaces.remove(namespace) else {
            return;
        };

        let count = entries.len();
        for (key, entry) in &entries {
            let id = EntryId::new(namespace, key.as_str());
            state.tags.detach(&id, &entry.tags);
        }

        debug!(namespace = %namespace, count = count, "Cache namespace cleared");
        self.metrics.record_evictions(EvictionReason::Cleared, count);
        self.metrics.update_entry_count(state.entry_count());
    }

    /// Resets every namespace and the whole tag index.
    pub fn clear_all(&self) {
        let mut state = self.state.lock();
        let count = state.entry_count();
        state.namespaces.clear();
        state.tags.clear();

        debug!(count = count, "All cache namespaces cleared");
        self.metrics.record_evictions(EvictionReason::Cleared, count);
        self.metrics.update_entry_count(0);
    }

    /// Purges every expired entry through the regular removal path.
    ///
    /// This is the pass the background sweeper runs on each tick; reads never
    /// depend on it.
    pub fn sweep_expired(&self) -> usize {
        self.metrics.time_operation("sweep", || {
            let mut state = self.state.lock();
            let now = Instant::now();

            let expired: Vec<EntryId> = state
                .namespaces
                .iter()
                .flat_map(|(namespace, entries)| {
                    entries
                        .iter()
                        .filter(|(_, entry)| entry.is_expired(now))
                        .map(move |(key, _)| EntryId::new(namespace, key))
                })
                .collect();

            let removed = expired
                .iter()
                .filter(|id| state.remove(id.namespace(), id.key()).is_some())
                .count();

            self.metrics.record_evictions(EvictionReason::Sweep, removed);
            self.metrics.update_entry_count(state.entry_count());
            removed
        })
    }

    /// Tags of a live entry, sorted. Does not remove expired entries.
    pub fn tags_of(&self, namespace: &str, key: &str) -> Option<Vec<String>> {
        let state = self.state.lock();
        let entry = state.namespaces.get(namespace)?.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(entry.tags.iter().cloned().collect())
    }

    /// Ids currently indexed under `tag`, sorted.
    pub fn keys_for_tag(&self, tag: &str) -> Vec<EntryId> {
        let mut ids = self.state.lock().tags.ids_for(tag);
        ids.sort();
        ids
    }

    /// Every tag with at least one entry, sorted.
    pub fn indexed_tags(&self) -> Vec<String> {
        let state = self.state.lock();
        let tags: BTreeSet<&String> = state.tags.tags().collect();
        tags.into_iter().cloned().collect()
    }

    /// Read-only introspection.
    ///
    /// Counts include expired entries that have not been removed yet; the
    /// per-namespace detail reports those separately. Details are only filled
    /// when no namespace filter is given.
    pub fn stats(&self, namespace: Option<&str>) -> CacheStats {
        let state = self.state.lock();
        let now = Instant::now();

        let mut all: Vec<String> = state.namespaces.keys().cloned().collect();
        all.sort();

        let selected: Vec<&String> = match namespace {
            Some(filter) => all.iter().filter(|name| name.as_str() == filter).collect(),
            None => all.iter().collect(),
        };

        let mut total_entries = 0;
        let mut details = std::collections::BTreeMap::new();
        for name in selected {
            let Some(entries) = state.namespaces.get(name.as_str()) else {
                continue;
            };
            let expired = entries.values().filter(|e| e.is_expired(now)).count();
            total_entries += entries.len();
            details.insert(
                name.clone(),
                NamespaceStats {
                    entries: entries.len(),
                    expired,
                },
            );
        }

        CacheStats {
            namespaces: all,
            total_entries,
            total_tags: state.tags.len(),
            namespace_details: namespace.is_none().then_some(details),
        }
    }

    /// Retorna las metricas para acceso externo.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

impl Default for TaggedCache {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}

impl std::fmt::Debug for TaggedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaggedCache")
            .field("default_ttl", &self.default_ttl)
            .field("namespaces", &state.namespaces.len())
            .field("entries", &state.entry_count())
            .field("tags", &state.tags.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TaggedCache {
        TaggedCache::new(Duration::from_secs(300))
    }

    #[test]
    fn test_set_and_get() {
        let cache = cache();
        cache.set("feed", "page-1", vec![1u32, 2, 3], SetOptions::new());

        assert_eq!(cache.get::<Vec<u32>>("feed", "page-1"), Some(vec![1, 2, 3]));
        assert!(cache.has("feed", "page-1"));
    }

    #[test]
    fn test_missing_returns_none() {
        let cache = cache();
        assert!(cache.get::<String>("feed", "nope").is_none());
        assert!(!cache.has("nope", "nope"));
        assert!(!cache.delete("nope", "nope"));
    }

    #[test]
    fn test_namespaces_are_independent() {
        let cache = cache();
        cache.set("profiles", "1", "alice".to_string(), SetOptions::new());
        cache.set("usernames", "1", "alice.dash".to_string(), SetOptions::new());

        assert_eq!(cache.get::<String>("profiles", "1").as_deref(), Some("alice"));
        assert_eq!(
            cache.get::<String>("usernames", "1").as_deref(),
            Some("alice.dash")
        );
    }

    #[test]
    fn test_type_mismatch_is_a_miss_and_keeps_entry() {
        let cache = cache();
        cache.set("avatars", "a", 7u64, SetOptions::new());

        assert!(cache.get::<String>("avatars", "a").is_none());
        assert_eq!(cache.get::<u64>("avatars", "a"), Some(7));
    }

    #[test]
    fn test_overwrite_replaces_tags() {
        let cache = cache();
        cache.set("feed", "k", 1u8, SetOptions::new().tags(["old", "shared"]));
        cache.set("feed", "k", 2u8, SetOptions::new().tags(["new", "shared"]));

        assert!(cache.keys_for_tag("old").is_empty());
        assert_eq!(cache.keys_for_tag("new"), vec![EntryId::new("feed", "k")]);
        assert_eq!(cache.keys_for_tag("shared"), vec![EntryId::new("feed", "k")]);
        assert_eq!(cache.indexed_tags(), vec!["new", "shared"]);
        assert_eq!(cache.get::<u8>("feed", "k"), Some(2));
    }

    #[test]
    fn test_delete_detaches_tags() {
        let cache = cache();
        cache.set("feed", "k", 1u8, SetOptions::new().tag("x"));

        assert!(cache.delete("feed", "k"));
        assert!(!cache.delete("feed", "k"));
        assert!(cache.indexed_tags().is_empty());
    }

    #[test]
    fn test_clear_namespace() {
        let cache = cache();
        cache.set("feed", "a", 1u8, SetOptions::new().tag("posts"));
        cache.set("feed", "b", 2u8, SetOptions::new().tag("posts"));
        cache.set("profiles", "c", 3u8, SetOptions::new().tag("users"));

        cache.clear("feed");
        cache.clear("unknown");

        assert!(!cache.has("feed", "a"));
        assert!(cache.has("profiles", "c"));
        assert_eq!(cache.indexed_tags(), vec!["users"]);
        assert_eq!(cache.stats(None).namespaces, vec!["profiles"]);
    }

    #[test]
    fn test_clear_all() {
        let cache = cache();
        cache.set("feed", "a", 1u8, SetOptions::new().tag("posts"));
        cache.set("profiles", "b", 2u8, SetOptions::new().tag("users"));

        cache.clear_all();

        let stats = cache.stats(None);
        assert!(stats.namespaces.is_empty());
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_tags, 0);
    }

    #[test]
    fn test_tags_of_and_debug() {
        let cache = cache();
        cache.set("feed", "a", 1u8, SetOptions::new().tags(["b", "a"]));

        assert_eq!(cache.tags_of("feed", "a"), Some(vec!["a".to_string(), "b".to_string()]));
        assert!(cache.tags_of("feed", "zz").is_none());
        assert!(format!("{:?}", cache).contains("entries: 1"));
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = cache();
        let other = cache.clone();

        other.set("feed", "a", 1u8, SetOptions::new());
        assert_eq!(cache.get::<u8>("feed", "a"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry_on_get() {
        let cache = cache();
        cache.set(
            "feed",
            "k",
            "v".to_string(),
            SetOptions::new().ttl(Duration::from_millis(100)).tag("x"),
        );

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(cache.has("feed", "k"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get::<String>("feed", "k").is_none());
        assert!(!cache.has("feed", "k"));
        assert!(cache.indexed_tags().is_empty());
        assert_eq!(cache.stats(None).total_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies() {
        let cache = TaggedCache::new(Duration::from_secs(1));
        cache.set("feed", "k", 1u8, SetOptions::new());

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(!cache.has("feed", "k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let cache = cache();
        cache.set("feed", "short", 1u8, SetOptions::new().ttl(Duration::from_millis(50)).tag("x"));
        cache.set("feed", "long", 2u8, SetOptions::new().ttl(Duration::from_secs(10)).tag("x"));

        tokio::time::advance(Duration::from_millis(51)).await;

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.sweep_expired(), 0);
        assert_eq!(cache.keys_for_tag("x"), vec![EntryId::new("feed", "long")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_do_not_purge_expired() {
        let cache = cache();
        cache.set("feed", "a", 1u8, SetOptions::new().ttl(Duration::from_millis(10)));
        cache.set("feed", "b", 2u8, SetOptions::new());

        tokio::time::advance(Duration::from_millis(11)).await;

        let stats = cache.stats(None);
        assert_eq!(stats.total_entries, 2);
        let details = stats.namespace_details.unwrap();
        assert_eq!(details["feed"].entries, 2);
        assert_eq!(details["feed"].expired, 1);

        // still physically there until read or swept
        assert_eq!(cache.stats(Some("feed")).total_entries, 2);
    }
}
