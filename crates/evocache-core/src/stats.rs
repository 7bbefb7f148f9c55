//! Read-only cache introspection.

use std::collections::BTreeMap;

use serde::Serialize;

/// Snapshot returned by [`TaggedCache::stats`](crate::TaggedCache::stats).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Every namespace currently holding a map, sorted.
    pub namespaces: Vec<String>,
    /// Entries physically present in the selected namespaces.
    pub total_entries: usize,
    /// Distinct tags in the index.
    pub total_tags: usize,
    /// Per-namespace counts; only present for unfiltered queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_details: Option<BTreeMap<String, NamespaceStats>>,
}

/// Counts for a single namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NamespaceStats {
    /// Entries stored, expired or not.
    pub entries: usize,
    /// Entries past their TTL that have not been removed yet.
    pub expired: usize,
}

impl NamespaceStats {
    /// Entries that would still be served by `get`.
    pub fn live(&self) -> usize {
        self.entries - self.expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_serialization() {
        let mut details = BTreeMap::new();
        details.insert(
            "feed".to_string(),
            NamespaceStats {
                entries: 3,
                expired: 1,
            },
        );
        let stats = CacheStats {
            namespaces: vec!["feed".to_string()],
            total_entries: 3,
            total_tags: 2,
            namespace_details: Some(details),
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalEntries"], 3);
        assert_eq!(json["totalTags"], 2);
        assert_eq!(json["namespaceDetails"]["feed"]["expired"], 1);
    }

    #[test]
    fn test_filtered_stats_skip_details() {
        let stats = CacheStats {
            namespaces: vec![],
            total_entries: 0,
            total_tags: 0,
            namespace_details: None,
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("namespaceDetails").is_none());
    }

    #[test]
    fn test_live_count() {
        let ns = NamespaceStats {
            entries: 5,
            expired: 2,
        };
        assert_eq!(ns.live(), 3);
    }
}
