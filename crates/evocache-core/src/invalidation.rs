//! Bulk invalidation by tag and by glob pattern.

use glob::Pattern;
use tracing::{debug, info};

use crate::cache::{CacheState, TaggedCache};
use crate::keys::EntryId;
use crate::metrics::EvictionReason;

impl CacheState {
    /// Removes every entry indexed under `tag`; ids already gone are skipped.
    fn invalidate_tag(&mut self, tag: &str) -> usize {
        self.tags
            .ids_for(tag)
            .iter()
            .filter(|id| self.remove(id.namespace(), id.key()).is_some())
            .count()
    }
}

impl TaggedCache {
    /// Invalida todas las entradas marcadas con `tag`.
    ///
    /// Other tags on those entries are detached too. Returns the number of
    /// entries actually removed; an unknown tag yields `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use evocache_core::{SetOptions, TaggedCache};
    /// let cache = TaggedCache::default();
    /// cache.set("feed", "page-1", 1u32, SetOptions::new().tag("posts"));
    /// cache.set("feed", "page-2", 2u32, SetOptions::new().tag("posts"));
    ///
    /// assert_eq!(cache.invalidate_by_tag("posts"), 2);
    /// assert_eq!(cache.invalidate_by_tag("posts"), 0);
    /// ```
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut state = self.state.lock();
        let count = state.invalidate_tag(tag);

        self.metrics.record_evictions(EvictionReason::Tag, count);
        self.metrics.update_entry_count(state.entry_count());
        info!(tag = %tag, count = count, "Cache entries invalidated by tag");
        count
    }

    /// Invalida varios tags a la vez.
    ///
    /// An entry carrying several of the tags is removed, and counted, once.
    pub fn invalidate_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        let mut state = self.state.lock();
        let count: usize = tags
            .iter()
            .map(|tag| state.invalidate_tag(tag.as_ref()))
            .sum();

        self.metrics.record_evictions(EvictionReason::Tag, count);
        self.metrics.update_entry_count(state.entry_count());
        info!(tags = tags.len(), count = count, "Cache entries invalidated by tags");
        count
    }

    /// Invalida entradas cuyo id `namespace:key` coincide con un patron glob.
    ///
    /// - `*`: coincide con cualquier secuencia de caracteres
    /// - `?`: coincide con un caracter
    ///
    /// An invalid pattern removes nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// # use evocache_core::{SetOptions, TaggedCache};
    /// let cache = TaggedCache::default();
    /// cache.set("feed", "page-1", 1u32, SetOptions::new());
    /// cache.set("profiles", "owner-1", 2u32, SetOptions::new());
    ///
    /// assert_eq!(cache.invalidate_by_pattern("feed:*"), 1);
    /// assert!(cache.has("profiles", "owner-1"));
    /// ```
    pub fn invalidate_by_pattern(&self, pattern_str: &str) -> usize {
        let pattern = match Pattern::new(pattern_str) {
            Ok(p) => p,
            Err(e) => {
                debug!(pattern = %pattern_str, error = %e, "Invalid glob pattern");
                return 0;
            },
        };

        let mut state = self.state.lock();
        let matching: Vec<EntryId> = state
            .ids()
            .into_iter()
            .filter(|id| pattern.matches(&id.to_string()))
            .collect();

        let count = matching
            .iter()
            .filter(|id| state.remove(id.namespace(), id.key()).is_some())
            .count();

        self.metrics.record_evictions(EvictionReason::Pattern, count);
        self.metrics.update_entry_count(state.entry_count());
        info!(pattern = %pattern_str, count = count, "Cache entries invalidated by pattern");
        count
    }
}
