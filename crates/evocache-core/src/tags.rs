//! Reverse index from tag to the entries that carry it.

use std::collections::{HashMap, HashSet};

use crate::keys::EntryId;

/// Tag bookkeeping owned by [`TaggedCache`](crate::TaggedCache).
///
/// A tag only has a slot while at least one entry carries it.
#[derive(Debug, Default)]
pub(crate) struct TagIndex {
    by_tag: HashMap<String, HashSet<EntryId>>,
}

impl TagIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `id` under every tag. Adding twice is a no-op.
    pub(crate) fn attach<'a, I>(&mut self, id: &EntryId, tags: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(id.clone());
        }
    }

    /// Removes `id` from every tag, dropping tags left without entries.
    pub(crate) fn detach<'a, I>(&mut self, id: &EntryId, tags: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            if let Some(ids) = self.by_tag.get_mut(tag) {
                ids.remove(id);
                if ids.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
    }

    /// Snapshot of the ids currently indexed under `tag`.
    pub(crate) fn ids_for(&self, tag: &str) -> Vec<EntryId> {
        self.by_tag
            .get(tag)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn tags(&self) -> impl Iterator<Item = &String> {
        self.by_tag.keys()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub(crate) fn clear(&mut self) {
        self.by_tag.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut index = TagIndex::new();
        let id = EntryId::new("feed", "page-1");
        let t = tags(&["posts"]);

        index.attach(&id, &t);
        index.attach(&id, &t);

        assert_eq!(index.ids_for("posts"), vec![id]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_detach_drops_empty_tags() {
        let mut index = TagIndex::new();
        let a = EntryId::new("feed", "a");
        let b = EntryId::new("feed", "b");

        index.attach(&a, &tags(&["posts", "user:1"]));
        index.attach(&b, &tags(&["posts"]));

        index.detach(&a, &tags(&["posts", "user:1"]));
        assert_eq!(index.ids_for("posts"), vec![b.clone()]);
        assert!(index.ids_for("user:1").is_empty());
        assert_eq!(index.len(), 1);

        index.detach(&b, &tags(&["posts"]));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_detach_unknown_is_noop() {
        let mut index = TagIndex::new();
        let id = EntryId::new("feed", "a");

        index.detach(&id, &tags(&["missing"]));
        assert_eq!(index.len(), 0);
    }
}
